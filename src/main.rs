mod app;
mod state;
mod ui;

use app::GeogateApp;
use eframe::egui;
use geogate::engine::{self, EngineError, Probe};
use geogate::{GatewayConfig, Session};

fn main() -> eframe::Result {
    env_logger::init();

    let config = GatewayConfig::from_env();
    log::info!("loading geospatial engine...");
    // No engine is linked into the desktop build; sessions run in fallback mode.
    let engine = engine::initialize(&config, || {
        Probe::Failed(EngineError::new("no geospatial engine linked into this build"))
    });
    let session = Session::new(config, engine);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Geogate – Cloud Native Gateway",
        options,
        Box::new(|_cc| Ok(Box::new(GeogateApp::new(session)))),
    )
}
