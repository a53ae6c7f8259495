//! serialscope crate root: re-exports and module wiring.
//!
//! A live oscilloscope for schema-less CSV streams such as a microcontroller
//! printing `time,temp,pressure` followed by rows of numbers. The crate is
//! split so the pipeline can run headless and be tested without a window:
//! - `data`: line assembly, header detection, record parsing, the rolling
//!   window and the per-frame axis planner
//! - `ingest`: the ingestion loop that turns bytes into records on its own thread
//! - `sink`: the record queue between threads and the render sink trait
//! - `source`: non-blocking byte sources
//! - `session`: connection state machine, commands and the render tick
//! - `config`: shared configuration and JSON persistence
//! - `app`: the egui/eframe front end

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod ingest;
pub mod session;
pub mod sink;
pub mod source;

// Public re-exports for a compact external API
pub use app::{run_scope, ScopeApp};
pub use config::ScopeConfig;
pub use data::planner::{Frame, RenderPlanner, ScaleMode};
pub use data::record::Record;
pub use data::schema::Schema;
pub use data::window::{Snapshot, TelemetryWindow};
pub use error::{Result, ScopeError};
pub use ingest::{IngestExit, Ingestor, LineOutcome};
pub use session::{ConnectionState, Session, TickReport};
pub use sink::{channel_records, CollectingSink, IngestMessage, RecordQueue, RecordSink, RenderSink};
pub use source::{ByteSource, PathOpener, ReaderSource, ScriptedSource, SourceOpener};
