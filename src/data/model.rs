use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

// ---------------------------------------------------------------------------
// RawFile – the bytes the user dropped or picked
// ---------------------------------------------------------------------------

/// An opaque byte sequence plus the filename it arrived under.
///
/// The name is only used to derive the extension and the base name of output
/// files. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    name: String,
    bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The file content decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Lower-cased text after the last `.`; empty when there is no dot.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => String::new(),
        }
    }

    /// File name without its last extension, used to name exports.
    pub fn base_name(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    pub fn format(&self) -> FileFormat {
        FileFormat::from_extension(&self.extension())
    }
}

// ---------------------------------------------------------------------------
// FileFormat – extension routing key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileFormat {
    GeoPackage,
    /// A zipped Shapefile.
    ShapefileZip,
    GeoTiff,
    GeoJson,
    Csv,
    /// Anything else, with its (lower-cased) extension.
    Other(String),
}

impl FileFormat {
    /// Case-insensitive mapping from an extension without the dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "gpkg" => FileFormat::GeoPackage,
            "zip" => FileFormat::ShapefileZip,
            "tif" | "tiff" => FileFormat::GeoTiff,
            "geojson" => FileFormat::GeoJson,
            "csv" => FileFormat::Csv,
            other => FileFormat::Other(other.to_string()),
        }
    }

    /// Whether the geospatial engine has a route for this format.
    pub fn has_primary_route(&self) -> bool {
        matches!(
            self,
            FileFormat::GeoPackage | FileFormat::ShapefileZip | FileFormat::GeoTiff
        )
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::GeoPackage => write!(f, "GeoPackage"),
            FileFormat::ShapefileZip => write!(f, "Shapefile (zip)"),
            FileFormat::GeoTiff => write!(f, "GeoTIFF"),
            FileFormat::GeoJson => write!(f, "GeoJSON"),
            FileFormat::Csv => write!(f, "CSV"),
            FileFormat::Other(ext) if ext.is_empty() => write!(f, "unknown"),
            FileFormat::Other(ext) => write!(f, ".{ext}"),
        }
    }
}

/// Which converter family the dispatcher should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Through the geospatial engine.
    Primary,
    /// Hand-written converters and the sample generator.
    Fallback,
}

// ---------------------------------------------------------------------------
// Conversion – what one successful converter call produces
// ---------------------------------------------------------------------------

/// Cloud-optimised raster produced by the engine from a GeoTIFF.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterProduct {
    pub cog: Vec<u8>,
    /// `[min_lon, min_lat, max_lon, max_lat]` when the engine knows it.
    pub wgs84_extent: Option<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Vector(FeatureCollection),
    Raster(RasterProduct),
}

impl Conversion {
    pub fn features(&self) -> Option<&FeatureCollection> {
        match self {
            Conversion::Vector(fc) => Some(fc),
            Conversion::Raster(_) => None,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features().map_or(0, |fc| fc.features.len())
    }
}

// ---------------------------------------------------------------------------
// Feature helpers
// ---------------------------------------------------------------------------

/// A `Point` feature at `[lon, lat]` (GeoJSON axis order).
pub fn point_feature(lon: f64, lat: f64, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![lon, lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
