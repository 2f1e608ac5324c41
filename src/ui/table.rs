use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};
use geojson::{FeatureCollection, JsonValue};

/// Rows shown before the table is cut off.
const MAX_ROWS: usize = 500;

/// Property table of the current collection; columns in first-seen order.
pub fn attribute_table(ui: &mut Ui, fc: &FeatureCollection) {
    let mut columns: Vec<&str> = Vec::new();
    for feature in fc.features.iter().take(MAX_ROWS) {
        for key in feature.properties.iter().flat_map(|p| p.keys()) {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let rows = fc.features.len().min(MAX_ROWS);
    if rows < fc.features.len() {
        ui.small(format!("showing {rows} of {} features", fc.features.len()));
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto().at_least(40.0))
        .columns(Column::auto().at_least(60.0).clip(true), columns.len())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("#");
            });
            for name in &columns {
                header.col(|ui| {
                    ui.strong(*name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, rows, |mut row| {
                let idx = row.index();
                let props = fc.features[idx].properties.as_ref();
                row.col(|ui| {
                    ui.label(idx.to_string());
                });
                for name in &columns {
                    let text = props
                        .and_then(|p| p.get(*name))
                        .map(cell_text)
                        .unwrap_or_default();
                    row.col(|ui| {
                        ui.label(text);
                    });
                }
            });
        });
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
