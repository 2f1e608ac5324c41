use thiserror::Error;

use crate::engine::EngineError;

// ---------------------------------------------------------------------------
// Conversion error taxonomy
// ---------------------------------------------------------------------------

/// Why a conversion attempt did not produce a result.
///
/// Only [`ConvertError::BothPathsFailed`] is meant to reach the user; every
/// other variant is absorbed by the pipeline and downgraded to a lesser data
/// source.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The geospatial engine never initialised; the session runs fallback-only.
    #[error("geospatial engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine threw during open/query/export of a primary attempt.
    #[error("engine {stage} failed: {source}")]
    EngineOperationFailed {
        stage: &'static str,
        #[source]
        source: EngineError,
    },

    /// Neither path recognises the extension.
    #[error("unsupported format: .{0}")]
    UnsupportedFormat(String),

    /// The content could not be interpreted (missing columns, invalid JSON, ...).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The shapefile collaborator rejected the archive.
    #[error("shapefile: {0}")]
    Shapefile(String),

    /// Primary and fallback both failed. Terminal.
    #[error("both conversion paths failed (primary: {primary}; fallback: {fallback})")]
    BothPathsFailed {
        primary: Box<ConvertError>,
        fallback: Box<ConvertError>,
    },
}

impl ConvertError {
    /// Wrap an engine failure with the operation that raised it.
    pub fn engine(stage: &'static str, source: EngineError) -> Self {
        ConvertError::EngineOperationFailed { stage, source }
    }

    /// Whether this error is terminal for the request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConvertError::BothPathsFailed { .. })
    }
}

/// Why an export could not be produced from the session.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("load a file first")]
    NoResult,

    /// The current result is a raster and carries no features.
    #[error("current result has no vector features")]
    NotVector,

    #[error("serializing export: {0}")]
    Serialize(#[from] serde_json::Error),
}
