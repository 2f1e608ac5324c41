use eframe::egui;
use geogate::RawFile;

use crate::state::AppState;
use crate::ui::{map, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct GeogateApp {
    pub state: AppState,
}

impl GeogateApp {
    pub fn new(session: geogate::Session) -> Self {
        Self {
            state: AppState::new(session),
        }
    }

    /// Take the first file dropped on the window this frame, if any.
    fn handle_drop(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.first().cloned());
        let Some(file) = dropped else {
            return;
        };

        if let Some(bytes) = &file.bytes {
            self.state.process(RawFile::new(file.name.clone(), bytes.to_vec()));
        } else if let Some(path) = &file.path {
            self.state.open_path(path);
        } else {
            log::warn!("dropped file {:?} carried neither bytes nor a path", file.name);
        }
    }
}

impl eframe::App for GeogateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_drop(ctx);
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: drop zone, status, downloads ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state, hovering);
            });

        // ---- Bottom panel: attribute table ----
        if self.state.show_table {
            if let Some(fc) = self
                .state
                .session
                .current()
                .and_then(|c| c.conversion.features())
            {
                egui::TopBottomPanel::bottom("attribute_table")
                    .resizable(true)
                    .default_height(200.0)
                    .show(ctx, |ui| {
                        table::attribute_table(ui, fc);
                    });
            }
        }

        // ---- Central panel: map preview ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map::map_view(ui, &mut self.state);
        });

        if self.state.session.map().has_pending() {
            ctx.request_repaint_after(self.state.session.config().preview_retry);
        }
    }
}
