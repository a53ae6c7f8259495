//! Drawing the planned frame.

use eframe::egui;
use egui::Color32;
use egui_plot::{GridInput, GridMark, Line, Plot};

use super::ScopeApp;
use crate::source::SourceOpener;

const TRACE_COLOR: Color32 = Color32::from_rgb(0, 255, 0);

/// Grid marks at exactly the planned tick positions.
fn marks(ticks: &[f64]) -> Vec<GridMark> {
    let step = match ticks {
        [a, b, ..] => (b - a).abs(),
        _ => 1.0,
    };
    ticks
        .iter()
        .map(|&value| GridMark {
            value,
            step_size: step,
        })
        .collect()
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        // ticks are already rounded; drop trailing zeros
        let s = format!("{value:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

impl<O: SourceOpener> ScopeApp<O> {
    pub(super) fn render_plot(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading(self.plot_title());
        });

        let frame = &self.view.frame;
        let x_ticks = frame.x_ticks.clone();
        let y_ticks = frame.y_ticks.clone();
        let y_label = self
            .session
            .selected_column()
            .unwrap_or("Value")
            .to_string();

        Plot::new("serialscope_plot")
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .allow_double_click_reset(false)
            .x_axis_label("Sample Number")
            .y_axis_label(y_label.clone())
            .x_grid_spacer(move |_input: GridInput| marks(&x_ticks))
            .y_grid_spacer(move |_input: GridInput| marks(&y_ticks))
            .x_axis_formatter(|mark, _range| format_tick(mark.value))
            .y_axis_formatter(|mark, _range| format_tick(mark.value))
            .show(ui, |plot_ui| {
                plot_ui.set_plot_bounds_x(frame.x_range.0..=frame.x_range.1);
                plot_ui.set_plot_bounds_y(frame.y_range.0..=frame.y_range.1);
                if !frame.points.is_empty() {
                    plot_ui.line(
                        Line::new(y_label, frame.points.clone())
                            .color(TRACE_COLOR)
                            .width(2.0),
                    );
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_labels() {
        assert_eq!(format_tick(100.0), "100");
        assert_eq!(format_tick(-3.75), "-3.75");
        assert_eq!(format_tick(22.5), "22.5");
    }

    #[test]
    fn marks_use_tick_spacing() {
        let m = marks(&[100.0, 200.0, 300.0]);
        assert_eq!(m.len(), 3);
        assert_eq!(m[1].value, 200.0);
        assert_eq!(m[1].step_size, 100.0);
    }
}
