//! Top-level entry point for running serialscope as a native window.

use eframe::egui;

use crate::config::ScopeConfig;
use crate::source::SourceOpener;

use super::ScopeApp;

/// Launch the oscilloscope in a native window.
///
/// If `initial_connect` is given the app connects to it before the first
/// frame. The call blocks until the window is closed.
pub fn run_scope<O>(
    config: ScopeConfig,
    opener: O,
    initial_connect: Option<String>,
) -> eframe::Result<()>
where
    O: SourceOpener + 'static,
{
    let title = config.title.clone();
    let mut app = ScopeApp::with_opener(config, opener)
        .map_err(|e| eframe::Error::AppCreation(Box::new(e)))?;
    if let Some(address) = initial_connect {
        app.address = address;
        app.connect();
    }

    let mut opts = eframe::NativeOptions::default();
    opts.viewport = opts
        .viewport
        .clone()
        .with_title(title.clone())
        .with_inner_size(egui::vec2(1000.0, 650.0));

    eframe::run_native(
        &title,
        opts,
        Box::new(|cc| {
            // Install Phosphor icon font before creating the app.
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);
            Ok(Box::new(app))
        }),
    )
}
