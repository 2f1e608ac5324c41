use eframe::egui::{Color32, Ui};
use egui_plot::{MarkerShape, Plot, PlotBounds, PlotPoints, Points};
use geogate::preview::PointStyle;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Point preview (central panel)
// ---------------------------------------------------------------------------

/// Render the preview map: lon/lat axes with the current point layer.
pub fn map_view(ui: &mut Ui, state: &mut AppState) {
    let map = state.session.map_mut();
    if !map.is_ready() {
        map.mark_ready();
    }

    let Some(layer) = map.layer().cloned() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Drop a file or use File → Open… to preview it");
        });
        return;
    };

    let style = PointStyle::default();
    let [r, g, b] = style.rgb();
    let fill = Color32::from_rgba_unmultiplied(r, g, b, (style.opacity * 255.0) as u8);

    // Pixel padding expressed as a fraction of the shorter side.
    let side = ui.available_width().min(ui.available_height()).max(1.0);
    let pad = f64::from(style.fit_padding) / f64::from(side);
    let fit = map.take_fit().map(|b| b.fitted(style.min_span(), pad));

    Plot::new("map_preview")
        .data_aspect(1.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if let Some(bounds) = fit {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(bounds.min, bounds.max));
            }
            if layer.points.is_empty() {
                return;
            }

            let outline: PlotPoints = layer.points.iter().copied().collect();
            plot_ui.points(
                Points::new(outline)
                    .shape(MarkerShape::Circle)
                    .radius((style.radius + style.stroke_width) as f32)
                    .color(Color32::WHITE),
            );

            let points: PlotPoints = layer.points.iter().copied().collect();
            plot_ui.points(
                Points::new(points)
                    .shape(MarkerShape::Circle)
                    .filled(true)
                    .radius(style.radius as f32)
                    .color(fill)
                    .name(&layer.name),
            );
        });
}
