use std::str::FromStr;

use geojson::{FeatureCollection, Value};
use palette::Srgb;
use serde_json::json;

use crate::data::model::Conversion;

// ---------------------------------------------------------------------------
// Point style shared by the preview and the HTML export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PointStyle {
    pub radius: f64,
    /// Fill colour as `#rrggbb`.
    pub color: &'static str,
    pub opacity: f64,
    pub stroke_width: f64,
    pub stroke_color: &'static str,
    /// Padding around fitted bounds, in pixels.
    pub fit_padding: u32,
    /// Fitting never zooms in further than this web-map zoom level.
    pub max_zoom: u8,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            radius: 6.0,
            color: "#ff6b6b",
            opacity: 0.9,
            stroke_width: 2.0,
            stroke_color: "white",
            fit_padding: 50,
            max_zoom: 12,
        }
    }
}

impl PointStyle {
    /// MapLibre `circle` paint properties.
    pub fn paint(&self) -> serde_json::Value {
        json!({
            "circle-radius": self.radius,
            "circle-color": self.color,
            "circle-opacity": self.opacity,
            "circle-stroke-width": self.stroke_width,
            "circle-stroke-color": self.stroke_color,
        })
    }

    /// Fill colour as 8-bit RGB; an unparsable colour falls back to red.
    pub fn rgb(&self) -> [u8; 3] {
        match Srgb::<u8>::from_str(self.color) {
            Ok(c) => [c.red, c.green, c.blue],
            Err(err) => {
                log::warn!("invalid point colour {:?}: {err}", self.color);
                [255, 0, 0]
            }
        }
    }

    /// Smallest span (degrees) a fitted view may show, from `max_zoom`.
    pub fn min_span(&self) -> f64 {
        360.0 / f64::from(1u32 << self.max_zoom)
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned lon/lat box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Bounds {
    pub fn point(p: [f64; 2]) -> Self {
        Self { min: p, max: p }
    }

    pub fn extend(&mut self, p: [f64; 2]) {
        self.min = [self.min[0].min(p[0]), self.min[1].min(p[1])];
        self.max = [self.max[0].max(p[0]), self.max[1].max(p[1])];
    }

    pub fn from_points(points: &[[f64; 2]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Bounds::point(*first);
        for p in rest {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    /// `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn from_extent(extent: [f64; 4]) -> Self {
        Self {
            min: [extent[0], extent[1]],
            max: [extent[2], extent[3]],
        }
    }

    /// Grow each axis to at least `min_span`, then add `pad` (fraction of the
    /// span) on every side.
    pub fn fitted(&self, min_span: f64, pad: f64) -> Self {
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..2 {
            let span = max[axis] - min[axis];
            if span < min_span {
                let grow = (min_span - span) / 2.0;
                min[axis] -= grow;
                max[axis] += grow;
            }
            let margin = (max[axis] - min[axis]) * pad;
            min[axis] -= margin;
            max[axis] += margin;
        }
        Self { min, max }
    }
}

// ---------------------------------------------------------------------------
// Preview layer
// ---------------------------------------------------------------------------

/// What the preview draws for one result.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewLayer {
    pub name: String,
    /// `[lon, lat]` of every Point feature, in feature order.
    pub points: Vec<[f64; 2]>,
    /// Features present but not drawn (non-point or missing geometry).
    pub skipped: usize,
    /// Where to fit the view; `None` leaves the view alone.
    pub bounds: Option<Bounds>,
}

impl PreviewLayer {
    pub fn from_collection(fc: &FeatureCollection, name: impl Into<String>) -> Self {
        let mut points = Vec::new();
        let mut skipped = 0;
        for feature in &fc.features {
            match feature.geometry.as_ref().map(|g| &g.value) {
                Some(Value::Point(p)) if p.len() >= 2 => points.push([p[0], p[1]]),
                _ => skipped += 1,
            }
        }
        let bounds = Bounds::from_points(&points);
        Self {
            name: name.into(),
            points,
            skipped,
            bounds,
        }
    }

    pub fn from_conversion(conversion: &Conversion, name: impl Into<String>) -> Self {
        match conversion {
            Conversion::Vector(fc) => Self::from_collection(fc, name),
            Conversion::Raster(product) => Self {
                name: name.into(),
                points: Vec::new(),
                skipped: 0,
                bounds: product.wgs84_extent.map(Bounds::from_extent),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Map handle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Shown,
    /// The map was not ready; the layer is held until [`MapPreview::mark_ready`].
    Deferred,
}

/// The single preview map of a session.
///
/// A display requested before the map has rendered its first frame is kept
/// and shown once the map reports ready.
#[derive(Debug, Default)]
pub struct MapPreview {
    ready: bool,
    layer: Option<PreviewLayer>,
    pending: Option<PreviewLayer>,
    fit: Option<Bounds>,
}

impl MapPreview {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn layer(&self) -> Option<&PreviewLayer> {
        self.layer.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace whatever is shown with `layer`.
    pub fn display(&mut self, layer: PreviewLayer) -> Display {
        if !self.ready {
            log::debug!("map not ready; deferring display of {:?}", layer.name);
            self.pending = Some(layer);
            return Display::Deferred;
        }
        self.fit = layer.bounds;
        log::debug!(
            "preview {:?}: {} point(s), {} skipped",
            layer.name,
            layer.points.len(),
            layer.skipped
        );
        self.layer = Some(layer);
        Display::Shown
    }

    /// Called by the renderer once it can draw. Returns whether a deferred
    /// display was flushed.
    pub fn mark_ready(&mut self) -> bool {
        self.ready = true;
        match self.pending.take() {
            Some(layer) => {
                self.display(layer);
                true
            }
            None => false,
        }
    }

    /// Bounds the renderer should fit to, once.
    pub fn take_fit(&mut self) -> Option<Bounds> {
        self.fit.take()
    }

    /// Drop the shown and pending layers.
    pub fn clear(&mut self) {
        self.layer = None;
        self.pending = None;
        self.fit = None;
    }
}
