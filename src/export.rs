use std::io;
use std::path::{Path, PathBuf};

use geojson::FeatureCollection;
use serde::Serialize;

use crate::data::model::{Conversion, RasterProduct};
use crate::preview::PointStyle;

// ---------------------------------------------------------------------------
// Export artifacts
// ---------------------------------------------------------------------------

/// One downloadable file derived from the current result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    /// Button label, e.g. `"GeoJSON"`.
    pub label: &'static str,
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write into `dir` under the artifact's own file name.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// JSON wrapper written under the `.fgb` and `.pmtiles` extensions.
///
/// This is a labelled envelope around GeoJSON, not the binary formats.
#[derive(Serialize)]
struct Envelope<'a> {
    format: &'static str,
    data: &'a FeatureCollection,
}

/// Every download offered for a conversion, named after `base`.
pub fn exports_for(conversion: &Conversion, base: &str) -> serde_json::Result<Vec<ExportArtifact>> {
    match conversion {
        Conversion::Vector(fc) => vector_exports(fc, base),
        Conversion::Raster(product) => Ok(vec![raster_export(product, base)]),
    }
}

/// GeoJSON plus the FlatGeobuf- and PMTiles-labelled envelopes.
pub fn vector_exports(fc: &FeatureCollection, base: &str) -> serde_json::Result<Vec<ExportArtifact>> {
    Ok(vec![
        ExportArtifact {
            label: "GeoJSON",
            filename: format!("{base}.geojson"),
            mime: "application/json",
            bytes: serde_json::to_vec_pretty(fc)?,
        },
        envelope("FlatGeobuf", "fgb", fc, base)?,
        envelope("PMTiles", "pmtiles", fc, base)?,
    ])
}

fn envelope(format: &'static str, ext: &str, fc: &FeatureCollection, base: &str) -> serde_json::Result<ExportArtifact> {
    Ok(ExportArtifact {
        label: format,
        filename: format!("{base}.{ext}"),
        mime: "application/octet-stream",
        bytes: serde_json::to_vec(&Envelope { format, data: fc })?,
    })
}

pub fn raster_export(product: &RasterProduct, base: &str) -> ExportArtifact {
    ExportArtifact {
        label: "Cloud-Optimized GeoTIFF",
        filename: format!("{base}.cog.tif"),
        mime: "image/tiff",
        bytes: product.cog.clone(),
    }
}

// ---------------------------------------------------------------------------
// Standalone HTML map
// ---------------------------------------------------------------------------

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Cloud Native Map</title>
    <link href="https://unpkg.com/maplibre-gl@4.0.0/dist/maplibre-gl.css" rel="stylesheet">
    <script src="https://unpkg.com/maplibre-gl@4.0.0/dist/maplibre-gl.js"></script>
    <style>
        body { margin: 0; padding: 0; }
        #map { position: absolute; top: 0; bottom: 0; width: 100%; }
    </style>
</head>
<body>
    <div id="map"></div>
    <script>
        const geojson = __GEOJSON__;

        const map = new maplibregl.Map({
            container: 'map',
            style: {
                version: 8,
                sources: {
                    'osm': {
                        type: 'raster',
                        tiles: ['__TILES__'],
                        tileSize: 256
                    },
                    'user-data': { type: 'geojson', data: geojson }
                },
                layers: [{ id: 'basemap', type: 'raster', source: 'osm' }]
            }
        });

        map.addControl(new maplibregl.NavigationControl(), 'top-right');

        map.on('load', () => {
            map.addLayer({
                id: 'user-points',
                type: 'circle',
                source: 'user-data',
                paint: __PAINT__
            });

            let bounds = null;
            geojson.features.forEach(feature => {
                if (feature.geometry && feature.geometry.type === 'Point') {
                    const [lng, lat] = feature.geometry.coordinates;
                    if (!bounds) {
                        bounds = new maplibregl.LngLatBounds([lng, lat], [lng, lat]);
                    } else {
                        bounds.extend([lng, lat]);
                    }
                }
            });

            if (bounds) {
                map.fitBounds(bounds, { padding: __PADDING__, maxZoom: __MAX_ZOOM__ });
            }
        });
    </script>
</body>
</html>
"#;

/// Raster basemap tile URL template.
pub const BASEMAP_TILES: &str = "https://a.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// A self-contained HTML document embedding `fc` in a MapLibre viewer.
pub fn map_html(fc: &FeatureCollection) -> serde_json::Result<String> {
    let style = PointStyle::default();
    // `</` inside a script element would end it early.
    let data = serde_json::to_string(fc)?.replace("</", "<\\/");
    let paint = serde_json::to_string(&style.paint())?;
    Ok(MAP_TEMPLATE
        .replace("__TILES__", BASEMAP_TILES)
        .replace("__PAINT__", &paint)
        .replace("__PADDING__", &style.fit_padding.to_string())
        .replace("__MAX_ZOOM__", &style.max_zoom.to_string())
        .replace("__GEOJSON__", &data))
}

pub fn map_html_artifact(fc: &FeatureCollection, filename: &str) -> serde_json::Result<ExportArtifact> {
    Ok(ExportArtifact {
        label: "HTML map",
        filename: filename.to_string(),
        mime: "text/html",
        bytes: map_html(fc)?.into_bytes(),
    })
}
