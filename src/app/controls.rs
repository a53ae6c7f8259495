//! Top bar and status line.

use eframe::egui;
use egui::{Color32, RichText};
use egui_phosphor::regular::{BROOM, PLUGS, PLUGS_CONNECTED};

use super::ScopeApp;
use crate::data::planner::ScaleMode;
use crate::session::ConnectionState;
use crate::source::SourceOpener;

fn state_color(state: ConnectionState) -> Color32 {
    match state {
        ConnectionState::Disconnected => Color32::GRAY,
        ConnectionState::Connecting => Color32::YELLOW,
        ConnectionState::Detecting => Color32::from_rgb(255, 165, 0),
        ConnectionState::Streaming => Color32::LIGHT_GREEN,
    }
}

impl<O: SourceOpener> ScopeApp<O> {
    pub(super) fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let state = self.session.state();

            ui.label("Port:");
            let editable = state == ConnectionState::Disconnected;
            let field = ui.add_enabled(
                editable,
                egui::TextEdit::singleline(&mut self.address).desired_width(160.0),
            );
            if field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.connect();
            }

            let button = if state == ConnectionState::Disconnected {
                format!("{PLUGS} Connect")
            } else {
                format!("{PLUGS_CONNECTED} Disconnect")
            };
            if ui.button(button).clicked() {
                self.toggle_connection();
            }
            ui.colored_label(state_color(self.session.state()), "●")
                .on_hover_text(self.session.state().to_string());

            ui.separator();
            self.render_signal_combo(ui);

            ui.separator();
            self.render_scale_combo(ui);

            ui.separator();
            if ui
                .button(format!("{BROOM} Clear"))
                .on_hover_text("Empty the plot and restart the sample counter")
                .clicked()
            {
                self.clear();
            }
        });
    }

    fn render_signal_combo(&mut self, ui: &mut egui::Ui) {
        ui.label("Signal:");
        let columns: Vec<String> = self
            .session
            .schema()
            .map(|s| s.columns().to_vec())
            .unwrap_or_default();
        let current = self.session.selected_index();
        let shown = self.session.selected_column().unwrap_or("-").to_string();
        let mut picked = None;
        ui.add_enabled_ui(!columns.is_empty(), |ui| {
            egui::ComboBox::from_id_salt("serialscope_signal")
                .selected_text(shown)
                .show_ui(ui, |ui| {
                    for (i, name) in columns.iter().enumerate() {
                        if ui.selectable_label(current == Some(i), name).clicked() {
                            picked = Some(i);
                        }
                    }
                });
        });
        if let Some(i) = picked {
            if let Err(e) = self.session.select_column_index(i) {
                tracing::warn!(error = %e, "signal selection rejected");
            }
        }
    }

    fn render_scale_combo(&mut self, ui: &mut egui::Ui) {
        ui.label("Y-Scale:");
        let presets: Vec<ScaleMode> = self.session.config().scale_presets.clone();
        let mut mode = self.session.scale_mode();
        egui::ComboBox::from_id_salt("serialscope_scale")
            .selected_text(mode.to_string())
            .show_ui(ui, |ui| {
                for preset in presets {
                    ui.selectable_value(&mut mode, preset, preset.to_string());
                }
            });
        if mode != self.session.scale_mode() {
            self.session.set_scale_mode(mode);
        }
    }

    pub(super) fn render_status(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let detection = match self.session.schema() {
                Some(s) => format!(
                    "Detected {} columns: {}",
                    s.len(),
                    s.columns().join(", ")
                ),
                None if self.session.state().is_open() => {
                    "Waiting for CSV header detection...".to_string()
                }
                None => "Not connected".to_string(),
            };
            ui.label(RichText::new(detection).color(Color32::LIGHT_BLUE));

            if let Some(at) = self.connected_at {
                ui.separator();
                ui.label(format!("Connected at {}", at.format("%H:%M:%S")));
            }
            if let Some(err) = self.session.last_error() {
                ui.separator();
                ui.colored_label(Color32::LIGHT_RED, err);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("Data points: {}", self.session.samples_seen()));
            });
        });
    }

    pub(super) fn render_error_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.connect_error.clone() else {
            return;
        };
        let mut open = true;
        egui::Window::new("Connection Error")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.colored_label(Color32::LIGHT_RED, message);
            });
        if !open {
            self.connect_error = None;
        }
    }
}
