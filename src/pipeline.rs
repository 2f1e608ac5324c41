use crate::config::GatewayConfig;
use crate::data::dispatch::Dispatcher;
use crate::data::model::{Conversion, ProcessingMode, RawFile};
use crate::data::shp::{ShapefileParser, ZipShapefileParser};
use crate::engine::EngineStatus;
use crate::error::{ConvertError, ExportError};
use crate::export::{exports_for, map_html_artifact, ExportArtifact};
use crate::preview::{MapPreview, PreviewLayer};

// ---------------------------------------------------------------------------
// Request stages
// ---------------------------------------------------------------------------

/// Where the current file-processing request is.
///
/// `Idle → Loading → PrimaryAttempt → (Success | FallbackAttempt) → (Success | Failed)`;
/// `PrimaryAttempt` is skipped when the engine is unavailable or has no route
/// for the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loading,
    PrimaryAttempt,
    FallbackAttempt,
    Success,
    Failed,
}

impl Stage {
    /// Progress bar percentage; `None` for the failed state.
    pub fn progress(self) -> Option<u8> {
        match self {
            Stage::Idle => Some(20),
            Stage::Loading => Some(30),
            Stage::PrimaryAttempt => Some(40),
            Stage::FallbackAttempt => Some(50),
            Stage::Success => Some(100),
            Stage::Failed => None,
        }
    }
}

/// Stage plus the human-readable status line shown next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub message: String,
}

impl Progress {
    fn enter(&mut self, stage: Stage, message: impl Into<String>) {
        self.stage = stage;
        self.message = message.into();
        log::info!("[{stage:?}] {}", self.message);
    }
}

// ---------------------------------------------------------------------------
// Current result
// ---------------------------------------------------------------------------

/// The one result a session holds; replaced wholesale by the next file.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentResult {
    pub file_name: String,
    pub base_name: String,
    pub conversion: Conversion,
    /// Which path produced it.
    pub mode: ProcessingMode,
    /// Downloads attached to this result.
    pub exports: Vec<ExportArtifact>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Owns everything one processing flow mutates: the engine status fixed at
/// start-up, the current result and the preview map.
pub struct Session {
    config: GatewayConfig,
    engine: EngineStatus,
    shapefile: Option<Box<dyn ShapefileParser>>,
    progress: Progress,
    current: Option<CurrentResult>,
    map: MapPreview,
}

impl Session {
    /// A session with the native zipped-Shapefile reader as fallback.
    pub fn new(config: GatewayConfig, engine: EngineStatus) -> Self {
        let progress = Progress {
            stage: Stage::Idle,
            message: engine.label(),
        };
        Self {
            config,
            engine,
            shapefile: Some(Box::new(ZipShapefileParser)),
            progress,
            current: None,
            map: MapPreview::default(),
        }
    }

    /// Swap the shapefile collaborator; `None` sends zips to the sample data.
    pub fn with_shapefile_parser(mut self, parser: Option<Box<dyn ShapefileParser>>) -> Self {
        self.shapefile = parser;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn engine(&self) -> &EngineStatus {
        &self.engine
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn stage(&self) -> Stage {
        self.progress.stage
    }

    pub fn current(&self) -> Option<&CurrentResult> {
        self.current.as_ref()
    }

    pub fn map(&self) -> &MapPreview {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapPreview {
        &mut self.map
    }

    /// Run one file through the pipeline.
    ///
    /// Recoverable conditions are absorbed; the only error returned is
    /// [`ConvertError::BothPathsFailed`].
    pub fn process(&mut self, file: RawFile) -> Result<&CurrentResult, ConvertError> {
        self.progress
            .enter(Stage::Loading, format!("Loading: {}", file.name()));
        self.current = None;

        let format = file.format();
        let try_primary = self.engine.is_ready() && format.has_primary_route();

        let dispatcher = Dispatcher::new(
            self.engine.engine(),
            self.shapefile.as_deref(),
            &self.config,
        );

        let mut primary_err = None;
        if try_primary {
            self.progress
                .enter(Stage::PrimaryAttempt, "Processing with geospatial engine...");
            match dispatcher.convert(&file, ProcessingMode::Primary) {
                Ok(conversion) => {
                    return Ok(self.succeed(&file, conversion, ProcessingMode::Primary, false));
                }
                Err(err) => {
                    log::warn!("primary conversion of {} failed: {err}", file.name());
                    primary_err = Some(err);
                }
            }
        }

        self.progress
            .enter(Stage::FallbackAttempt, "Using fallback processor...");
        match dispatcher.convert(&file, ProcessingMode::Fallback) {
            Ok(conversion) => {
                let after_failure = primary_err.is_some();
                Ok(self.succeed(&file, conversion, ProcessingMode::Fallback, after_failure))
            }
            Err(fallback) => {
                let primary = primary_err.unwrap_or_else(|| match &self.engine {
                    EngineStatus::Unavailable { reason } => {
                        ConvertError::EngineUnavailable(reason.clone())
                    }
                    EngineStatus::Ready(_) => ConvertError::UnsupportedFormat(file.extension()),
                });
                let err = ConvertError::BothPathsFailed {
                    primary: Box::new(primary),
                    fallback: Box::new(fallback),
                };
                log::error!("{}: {err}", file.name());
                self.progress
                    .enter(Stage::Failed, format!("Both methods failed: {err}"));
                Err(err)
            }
        }
    }

    fn succeed(
        &mut self,
        file: &RawFile,
        conversion: Conversion,
        mode: ProcessingMode,
        after_failure: bool,
    ) -> &CurrentResult {
        let base_name = file.base_name().to_string();
        let exports = exports_for(&conversion, &base_name).unwrap_or_else(|err| {
            log::error!("building exports for {}: {err}", file.name());
            Vec::new()
        });

        self.map
            .display(PreviewLayer::from_conversion(&conversion, base_name.as_str()));

        let mut message = if after_failure {
            "Processing complete (fallback mode)!".to_string()
        } else {
            "Processing complete!".to_string()
        };
        if mode == ProcessingMode::Fallback {
            message.push_str(&format!(" {} feature(s)", conversion.feature_count()));
        }
        self.progress.enter(Stage::Success, message);

        self.current.insert(CurrentResult {
            file_name: file.name().to_string(),
            base_name,
            conversion,
            mode,
            exports,
        })
    }

    /// The standalone HTML map of the current result.
    pub fn html_map(&self) -> Result<ExportArtifact, ExportError> {
        let current = self.current.as_ref().ok_or(ExportError::NoResult)?;
        let fc = current.conversion.features().ok_or(ExportError::NotVector)?;
        Ok(map_html_artifact(fc, &self.config.html_filename)?)
    }
}
