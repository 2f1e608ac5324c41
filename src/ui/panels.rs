use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use geogate::export::ExportArtifact;
use geogate::Stage;

use crate::state::AppState;

const SUPPORTED: [&str; 6] = ["gpkg", "zip", "tif", "tiff", "geojson", "csv"];

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let engine = state.session.engine();
        let badge = if engine.is_ready() {
            RichText::new(engine.label()).color(Color32::DARK_GREEN)
        } else {
            RichText::new(engine.label()).color(Color32::from_rgb(0xc0, 0x80, 0x00))
        };
        ui.label(badge);

        ui.separator();

        if let Some(current) = state.session.current() {
            ui.label(format!(
                "{}: {} feature(s)",
                current.file_name,
                current.conversion.feature_count()
            ));
        }

        ui.separator();

        if ui
            .selectable_label(state.show_table, "Attribute table")
            .clicked()
        {
            state.show_table = !state.show_table;
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – drop zone, status, downloads
// ---------------------------------------------------------------------------

pub fn side_panel(ui: &mut Ui, state: &mut AppState, hovering: bool) {
    drop_zone(ui, state, hovering);
    ui.add_space(8.0);

    status(ui, state);
    ui.separator();

    ui.heading("Downloads");
    let Some(current) = state.session.current() else {
        ui.label("No file converted yet.");
        return;
    };

    let mut to_save: Option<ExportArtifact> = None;
    for artifact in &current.exports {
        if ui.button(format!("📥 Download {}", artifact.label)).clicked() {
            to_save = Some(artifact.clone());
        }
    }

    ui.separator();
    ui.heading("Map");
    if ui.button("🗺 Download HTML map").clicked() {
        match state.session.html_map() {
            Ok(artifact) => to_save = Some(artifact),
            Err(e) => state.notice = Some(e.to_string()),
        }
    }

    if let Some(artifact) = to_save {
        save_file_dialog(state, &artifact);
    }

    if let Some(msg) = &state.notice {
        ui.add_space(4.0);
        ui.label(RichText::new(msg).color(Color32::RED));
    }
}

fn drop_zone(ui: &mut Ui, state: &mut AppState, hovering: bool) {
    let stroke = if hovering {
        Stroke::new(2.0, Color32::LIGHT_BLUE)
    } else {
        Stroke::new(1.0, Color32::GRAY)
    };
    egui::Frame::group(ui.style())
        .stroke(stroke)
        .inner_margin(12.0)
        .show(ui, |ui: &mut Ui| {
            ui.vertical_centered(|ui: &mut Ui| {
                ui.label(RichText::new("Drop a geospatial file here").strong());
                ui.label("GeoPackage, zipped Shapefile, GeoTIFF, GeoJSON, CSV");
                if ui.button("Browse…").clicked() {
                    open_file_dialog(state);
                }
            });
        });
}

fn status(ui: &mut Ui, state: &AppState) {
    let progress = state.session.progress();
    match progress.stage.progress() {
        Some(pct) => {
            ui.add(egui::ProgressBar::new(f32::from(pct) / 100.0).show_percentage());
            ui.label(&progress.message);
        }
        None => {
            ui.add(egui::ProgressBar::new(1.0).fill(Color32::from_rgb(0xff, 0x3b, 0x30)));
            ui.label(RichText::new(&progress.message).color(Color32::from_rgb(0xff, 0x3b, 0x30)));
        }
    }
    if progress.stage == Stage::Success {
        if let Some(layer) = state.session.map().layer() {
            if layer.skipped > 0 {
                ui.small(format!("{} non-point feature(s) not drawn", layer.skipped));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open geospatial data")
        .add_filter("Supported files", &SUPPORTED)
        .add_filter("GeoPackage", &["gpkg"])
        .add_filter("Zipped Shapefile", &["zip"])
        .add_filter("GeoTIFF", &["tif", "tiff"])
        .add_filter("GeoJSON", &["geojson"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}

fn save_file_dialog(state: &mut AppState, artifact: &ExportArtifact) {
    let Some(path) = rfd::FileDialog::new()
        .set_title(format!("Save {}", artifact.label))
        .set_file_name(&artifact.filename)
        .save_file()
    else {
        return;
    };

    match std::fs::write(&path, &artifact.bytes) {
        Ok(()) => {
            log::info!("saved {} to {}", artifact.label, path.display());
            state.notice = None;
        }
        Err(e) => {
            log::error!("Failed to save {}: {e}", path.display());
            state.notice = Some(format!("Error: {e}"));
        }
    }
}
