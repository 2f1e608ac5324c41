use std::path::Path;

use geogate::{RawFile, Session};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Engine status, current result and preview map.
    pub session: Session,

    /// Whether the attribute table is expanded.
    pub show_table: bool,

    /// Last dialog / export message, shown until the next action.
    pub notice: Option<String>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            show_table: true,
            notice: None,
        }
    }

    /// Run a file through the pipeline. The session keeps the outcome.
    pub fn process(&mut self, file: RawFile) {
        self.notice = None;
        match self.session.process(file) {
            Ok(current) => log::info!(
                "{} converted via {:?}: {} feature(s), {} export(s)",
                current.file_name,
                current.mode,
                current.conversion.feature_count(),
                current.exports.len()
            ),
            // The session already moved to the failed stage with the message.
            Err(err) => log::debug!("request failed: {err}"),
        }
    }

    pub fn open_path(&mut self, path: &Path) {
        match RawFile::from_path(path) {
            Ok(file) => self.process(file),
            Err(e) => {
                log::error!("Failed to read file: {e:#}");
                self.notice = Some(format!("Error: {e:#}"));
            }
        }
    }
}
