//! Connection lifecycle, external commands and the render tick.
//!
//! A [`Session`] owns everything on the consumer side: the schema, the
//! [`TelemetryWindow`], the selected column and the scale mode. The only thing
//! it shares with the ingestion thread is the [`RecordQueue`].
//!
//! ```text
//! Disconnected --connect--> Connecting --opened--> Detecting --header--> Streaming
//!      ^                        |                      |                     |
//!      +------- open failed ----+---- disconnect / source failure ----------+
//! ```
//!
//! Entering `Disconnected` or `Connecting` drops the schema, the window, the
//! sample counter and anything still queued.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::ScopeConfig;
use crate::data::planner::{Frame, RenderPlanner, ScaleMode};
use crate::data::schema::Schema;
use crate::data::window::TelemetryWindow;
use crate::error::{Result, ScopeError};
use crate::ingest::{spawn_ingestion, IngestHandle};
use crate::sink::{channel_records, IngestMessage, RecordQueue, RenderSink};
use crate::source::SourceOpener;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Stream open, header not seen yet.
    Detecting,
    /// Header known, records flowing.
    Streaming,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        matches!(self, ConnectionState::Detecting | ConnectionState::Streaming)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Detecting => "detecting",
            ConnectionState::Streaming => "streaming",
        };
        f.write_str(s)
    }
}

/// Summary of one [`Session::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Records folded into the window this tick.
    pub folded: usize,
    pub schema_detected: bool,
    /// A frame was handed to the sink.
    pub updated: bool,
    /// The source failed and the session is now disconnected.
    pub failure: Option<String>,
}

pub struct Session<O: SourceOpener> {
    config: ScopeConfig,
    opener: O,
    planner: RenderPlanner,

    state: ConnectionState,
    address: Option<String>,
    schema: Option<Schema>,
    window: TelemetryWindow,
    selected: Option<usize>,
    scale: ScaleMode,
    last_error: Option<String>,
    // Schema adopted but not yet announced to a sink.
    announce_schema: bool,

    queue: Option<RecordQueue>,
    ingest: Option<IngestHandle>,
}

impl<O: SourceOpener> Session<O> {
    pub fn new(config: ScopeConfig, opener: O) -> Result<Self> {
        config.validate()?;
        let scale = config.initial_scale;
        Ok(Self {
            planner: RenderPlanner::new(config.capacity, config.x_tick_step),
            window: TelemetryWindow::new(0, config.capacity),
            config,
            opener,
            state: ConnectionState::Disconnected,
            address: None,
            schema: None,
            selected: None,
            scale,
            last_error: None,
            announce_schema: false,
            queue: None,
            ingest: None,
        })
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Open `address` and start the ingestion loop.
    ///
    /// An already open connection is closed first. If the source cannot be
    /// opened the session ends up `Disconnected` and the error is returned.
    pub fn connect(&mut self, address: &str) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            self.disconnect();
        }
        self.state = ConnectionState::Connecting;
        self.reset();
        self.last_error = None;
        info!(address, "connecting");

        let opened = self.opener.open(address).and_then(|source| {
            let (sink, queue) = channel_records();
            spawn_ingestion(address, source, sink, &self.config).map(|handle| (handle, queue))
        });
        match opened {
            Ok((handle, queue)) => {
                self.ingest = Some(handle);
                self.queue = Some(queue);
                self.address = Some(address.to_string());
                self.state = ConnectionState::Detecting;
                info!(address, "connected, waiting for CSV header");
                Ok(())
            }
            Err(source) => {
                let err = ScopeError::Transport {
                    address: address.to_string(),
                    source,
                };
                warn!(error = %err, "failed to connect");
                self.last_error = Some(err.to_string());
                self.state = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Stop the ingestion loop and drop all connection state.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            info!(address = self.address.as_deref().unwrap_or(""), "disconnecting");
        }
        self.reset();
        self.state = ConnectionState::Disconnected;
    }

    /// Empty the window and restart the sample counter; the schema and connection stay.
    pub fn clear(&mut self) {
        self.window.clear();
        let Some(queue) = self.queue.as_mut() else {
            return;
        };
        // a schema or failure notice still in flight must not be lost with the records
        let mut dropped = 0;
        let mut pending = Vec::new();
        for msg in queue.drain_batch(usize::MAX) {
            match msg {
                IngestMessage::Record(_) => dropped += 1,
                other => pending.push(other),
            }
        }
        debug!(dropped, "cleared window and flushed queue");
        for msg in pending {
            match msg {
                IngestMessage::SchemaDetected(schema) => self.adopt_schema(schema),
                IngestMessage::SourceFailed(reason) => self.fail(reason),
                IngestMessage::Record(_) => {}
            }
        }
    }

    /// Plot the first column called `name`.
    pub fn select_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .schema
            .as_ref()
            .and_then(|s| s.position(name))
            .ok_or_else(|| ScopeError::UnknownColumn(name.to_string()))?;
        self.selected = Some(idx);
        Ok(())
    }

    /// Plot the column at `index` (useful when names repeat).
    pub fn select_column_index(&mut self, index: usize) -> Result<()> {
        match &self.schema {
            Some(s) if index < s.len() => {
                self.selected = Some(index);
                Ok(())
            }
            _ => Err(ScopeError::UnknownColumn(format!("#{index}"))),
        }
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.scale = mode;
    }

    // ── Render tick ──────────────────────────────────────────────────────────

    /// Drain up to one batch from the queue, fold it, and hand the sink a frame if one is available.
    pub fn tick(&mut self, sink: &mut dyn RenderSink) -> TickReport {
        let mut report = TickReport::default();
        let messages = match self.queue.as_mut() {
            Some(q) => q.drain_batch(self.config.batch_limit),
            None => Vec::new(),
        };

        for msg in messages {
            match msg {
                IngestMessage::SchemaDetected(schema) => self.adopt_schema(schema),
                IngestMessage::Record(record) => {
                    if self.schema.is_none() {
                        continue;
                    }
                    match self.window.fold(&record) {
                        Ok(()) => report.folded += 1,
                        Err(e) => debug!(error = %e, "record rejected by window"),
                    }
                }
                IngestMessage::SourceFailed(reason) => {
                    self.fail(reason.clone());
                    report.failure = Some(reason);
                    return report;
                }
            }
        }

        if self.announce_schema {
            if let Some(schema) = &self.schema {
                sink.on_schema_detected(schema.columns());
                report.schema_detected = true;
            }
            self.announce_schema = false;
        }

        if let Some(frame) = self.current_frame() {
            sink.on_frame(&frame);
            report.updated = true;
        }
        report
    }

    /// The frame for the current window contents, or `None` if there is too little data.
    pub fn current_frame(&self) -> Option<Frame> {
        let snapshot = self.selected.and_then(|c| self.window.snapshot(c));
        self.planner.plan(snapshot, self.scale)
    }

    /// Frame to show before any update.
    pub fn idle_frame(&self) -> Frame {
        self.planner.idle()
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn selected_column(&self) -> Option<&str> {
        let idx = self.selected?;
        self.schema.as_ref()?.name(idx)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale
    }

    pub fn samples_seen(&self) -> u64 {
        self.window.samples_seen()
    }

    pub fn window(&self) -> &TelemetryWindow {
        &self.window
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Message of the last transport failure, cleared by the next `connect`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True while an ingestion thread is alive for this session.
    pub fn is_ingesting(&self) -> bool {
        self.ingest.as_ref().is_some_and(|h| !h.is_finished())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn adopt_schema(&mut self, schema: Schema) {
        if self.state != ConnectionState::Detecting {
            debug!(state = %self.state, "ignoring schema outside detection");
            return;
        }
        info!(columns = schema.len(), "detected {} columns: {}", schema.len(), schema.columns().join(", "));
        self.window.reset(schema.len());
        self.selected = if schema.is_empty() { None } else { Some(0) };
        self.state = ConnectionState::Streaming;
        self.schema = Some(schema);
        self.announce_schema = true;
    }

    fn fail(&mut self, reason: String) {
        let err = ScopeError::Transport {
            address: self.address.clone().unwrap_or_default(),
            source: std::io::Error::other(reason),
        };
        warn!(error = %err, "source failed, disconnecting");
        self.disconnect();
        self.last_error = Some(err.to_string());
    }

    fn reset(&mut self) {
        if let Some(handle) = self.ingest.take() {
            handle.stop();
        }
        if let Some(mut queue) = self.queue.take() {
            let dropped = queue.flush();
            if dropped > 0 {
                debug!(dropped, "flushed queue on reset");
            }
        }
        self.schema = None;
        self.announce_schema = false;
        self.selected = None;
        self.window.reset(0);
        self.address = None;
    }
}
