//! Geospatial file gateway: detect a file's format, convert it to GeoJSON
//! through an optional geospatial engine or hand-written fallbacks, preview
//! its points and export the result.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod preview;

pub use config::GatewayConfig;
pub use data::model::{Conversion, FileFormat, ProcessingMode, RasterProduct, RawFile};
pub use error::ConvertError;
pub use pipeline::{Session, Stage};
