//! Seam for the external geospatial engine (a GDAL-like library).
//!
//! The gateway never links an engine itself; embedders hand one in through
//! [`initialize`]. Without one the session runs in fallback mode.

use std::fmt;
use std::thread;

use geojson::{Feature, FeatureCollection};
use thiserror::Error;

use crate::config::GatewayConfig;

/// Failure raised by an engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// One layer of an opened dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
}

/// Dataset metadata the gateway cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetInfo {
    /// `[min_lon, min_lat, max_lon, max_lat]`.
    pub wgs84_extent: Option<[f64; 4]>,
}

/// Rows returned by [`EngineDataset::execute_sql`], still in the dataset's
/// native spatial reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFeatures(pub Vec<Feature>);

/// An opened dataset.
pub trait EngineDataset {
    fn layers(&self) -> EngineResult<Vec<LayerInfo>>;
    fn execute_sql(&self, query: &str) -> EngineResult<QueryFeatures>;
    /// Reproject query rows into `target_srs` and wrap them as a collection.
    fn to_geojson(&self, features: QueryFeatures, target_srs: &str) -> EngineResult<FeatureCollection>;
    fn info(&self) -> EngineResult<DatasetInfo>;
}

pub trait GeoEngine {
    fn version(&self) -> String;
    /// Whether `open` is usable. An engine without it counts as unavailable.
    fn can_open(&self) -> bool;
    fn open(&self, bytes: &[u8]) -> EngineResult<Box<dyn EngineDataset>>;
    /// Translate a dataset into another driver's format, e.g. `"COG"`.
    fn export(&self, dataset: &dyn EngineDataset, format: &str, options: &[&str]) -> EngineResult<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// Start-up
// ---------------------------------------------------------------------------

/// Outcome of engine start-up, fixed for the lifetime of a session.
pub enum EngineStatus {
    Ready(Box<dyn GeoEngine>),
    Unavailable { reason: String },
}

impl EngineStatus {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        EngineStatus::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn engine(&self) -> Option<&dyn GeoEngine> {
        match self {
            EngineStatus::Ready(engine) => Some(engine.as_ref()),
            EngineStatus::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, EngineStatus::Ready(_))
    }

    /// Short label for status badges.
    pub fn label(&self) -> String {
        match self {
            EngineStatus::Ready(engine) => format!("Engine ready ({})", engine.version()),
            EngineStatus::Unavailable { .. } => "Engine unavailable (fallback mode)".to_string(),
        }
    }
}

impl fmt::Debug for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Ready(engine) => f
                .debug_tuple("Ready")
                .field(&engine.version())
                .finish(),
            EngineStatus::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// What a single probe of the engine loader found.
pub enum Probe {
    /// Not loaded yet; ask again after the configured delay.
    Pending,
    Loaded(Box<dyn GeoEngine>),
    Failed(EngineError),
}

/// Probe `loader` until it settles or the retry budget runs out.
///
/// Runs once per session. Sleeps `config.engine_delay` between pending
/// probes and never loops more than `config.engine_attempts` times.
pub fn initialize<F>(config: &GatewayConfig, mut loader: F) -> EngineStatus
where
    F: FnMut() -> Probe,
{
    let attempts = config.engine_attempts.max(1);
    for attempt in 1..=attempts {
        match loader() {
            Probe::Loaded(engine) if engine.can_open() => {
                log::info!("geospatial engine {} ready", engine.version());
                return EngineStatus::Ready(engine);
            }
            Probe::Loaded(engine) => {
                let reason = format!("engine {} has no open capability", engine.version());
                log::warn!("{reason}; running in fallback mode");
                return EngineStatus::unavailable(reason);
            }
            Probe::Failed(err) => {
                log::warn!("geospatial engine failed to initialise: {err}; running in fallback mode");
                return EngineStatus::unavailable(err.message);
            }
            Probe::Pending if attempt < attempts => thread::sleep(config.engine_delay),
            Probe::Pending => {}
        }
    }
    let reason = format!("engine did not load after {attempts} attempt(s)");
    log::warn!("{reason}; running in fallback mode");
    EngineStatus::unavailable(reason)
}
