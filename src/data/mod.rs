/// Data layer: file model, format dispatch and the fallback converters.
///
/// Architecture:
/// ```text
///  .gpkg / .zip / .tif / .geojson / .csv / other
///        │
///        ▼
///   ┌────────────┐   primary   ┌─────────────────┐
///   │  dispatch   │ ──────────▶ │ geospatial engine│
///   └────────────┘             └─────────────────┘
///        │ fallback
///        ▼
///   ┌──────────┬──────────┬──────────┬──────────┐
///   │ shp (zip) │ geojson  │ tabular  │  sample   │
///   └──────────┴──────────┴──────────┴──────────┘
///        │
///        ▼
///   Conversion (FeatureCollection | RasterProduct)
/// ```

pub mod columns;
pub mod dispatch;
pub mod model;
pub mod sample;
pub mod shp;
pub mod tabular;
