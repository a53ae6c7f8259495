//! Native front end for serialscope.
//!
//! The shell holds no pipeline logic of its own: it issues commands to a
//! [`Session`], ticks it once per repaint and draws whatever frame the session
//! hands back through the [`RenderSink`] implemented by [`PlotView`].
//!
//! | Sub-module   | Responsibility |
//! | ------------ | -------------- |
//! | [`controls`] | Top bar (address, connect, signal, Y-scale, clear) and status line |
//! | [`plot`]     | Drawing a [`Frame`] with egui_plot |
//! | [`run`]      | [`run_scope()`] entry point |

mod controls;
mod plot;
mod run;

pub use run::run_scope;

use chrono::{DateTime, Local};
use eframe::egui;

use crate::config::ScopeConfig;
use crate::data::planner::Frame;
use crate::error::Result;
use crate::session::{ConnectionState, Session};
use crate::sink::RenderSink;
use crate::source::{PathOpener, SourceOpener};

// ─────────────────────────────────────────────────────────────────────────────
// PlotView – what the render sink keeps between ticks
// ─────────────────────────────────────────────────────────────────────────────

/// Last schema and frame received from the session.
///
/// When a tick yields no update the previous frame stays on screen.
#[derive(Debug, Clone)]
pub struct PlotView {
    pub columns: Vec<String>,
    pub frame: Frame,
}

impl PlotView {
    fn new(idle: Frame) -> Self {
        Self {
            columns: Vec::new(),
            frame: idle,
        }
    }
}

impl RenderSink for PlotView {
    fn on_schema_detected(&mut self, columns: &[String]) {
        self.columns = columns.to_vec();
    }

    fn on_frame(&mut self, frame: &Frame) {
        self.frame = frame.clone();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScopeApp
// ─────────────────────────────────────────────────────────────────────────────

/// Oscilloscope window: one session, one plotted signal.
pub struct ScopeApp<O: SourceOpener = PathOpener> {
    pub(crate) session: Session<O>,
    pub(crate) view: PlotView,
    /// Contents of the address field.
    pub(crate) address: String,
    pub(crate) connected_at: Option<DateTime<Local>>,
    /// Error from the last connect attempt, shown until dismissed.
    pub(crate) connect_error: Option<String>,
    title: String,
}

impl ScopeApp<PathOpener> {
    /// App reading from filesystem paths (`/dev/tty*`, pipes, files, `-` for stdin).
    pub fn new(config: ScopeConfig) -> Result<Self> {
        Self::with_opener(config, PathOpener)
    }
}

impl<O: SourceOpener> ScopeApp<O> {
    pub fn with_opener(config: ScopeConfig, opener: O) -> Result<Self> {
        let address = config.default_address.clone();
        let title = config.title.clone();
        let session = Session::new(config, opener)?;
        let view = PlotView::new(session.idle_frame());
        Ok(Self {
            session,
            view,
            address,
            connected_at: None,
            connect_error: None,
            title,
        })
    }

    pub fn session(&self) -> &Session<O> {
        &self.session
    }

    pub fn view(&self) -> &PlotView {
        &self.view
    }

    /// Connect to the address currently in the address field.
    pub fn connect(&mut self) {
        let address = self.address.trim().to_string();
        self.reset_view();
        match self.session.connect(&address) {
            Ok(()) => {
                self.connected_at = Some(Local::now());
                self.connect_error = None;
            }
            Err(e) => {
                self.connected_at = None;
                self.connect_error = Some(format!("Failed to connect: {e}"));
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
        self.connected_at = None;
        self.reset_view();
    }

    pub fn toggle_connection(&mut self) {
        if self.session.state() == ConnectionState::Disconnected {
            self.connect();
        } else {
            self.disconnect();
        }
    }

    pub fn clear(&mut self) {
        self.session.clear();
        self.view.frame = self.session.idle_frame();
    }

    /// One render cycle without drawing: drain, fold, plan.
    pub fn tick(&mut self) {
        let report = self.session.tick(&mut self.view);
        if report.failure.is_some() {
            self.connected_at = None;
            self.reset_view();
        }
    }

    fn reset_view(&mut self) {
        self.view = PlotView::new(self.session.idle_frame());
    }

    /// Window title following the detection state and selected signal.
    pub fn plot_title(&self) -> String {
        if let Some(col) = self.session.selected_column() {
            if self.session.samples_seen() > 0 {
                return format!("{} - {}", self.title, col);
            }
        }
        match self.session.schema() {
            Some(s) => format!("{} - {} signals detected", self.title, s.len()),
            None => format!("{} - Waiting for data...", self.title),
        }
    }
}

impl<O: SourceOpener + 'static> eframe::App for ScopeApp<O> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.tick();

        egui::TopBottomPanel::top("serialscope_controls").show(ctx, |ui| {
            self.render_controls(ui);
        });
        egui::TopBottomPanel::top("serialscope_status").show(ctx, |ui| {
            self.render_status(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_plot(ui);
        });
        self.render_error_window(ctx);

        ctx.request_repaint_after(self.session.config().render_interval());
    }
}
