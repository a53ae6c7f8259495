//! Channels between the ingestion thread and the render tick, and the render sink trait.
//!
//! The ingestion side owns a [`RecordSink`]; the render side owns the matching
//! [`RecordQueue`]. Enqueueing never blocks and is unbounded. Draining is
//! capped per call so a fast producer cannot stall a frame.

use std::sync::mpsc::{Receiver, SendError, Sender, TryRecvError};

use crate::data::planner::Frame;
use crate::data::record::Record;
use crate::data::schema::Schema;

/// Messages sent over the channel from the ingestion loop.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestMessage {
    /// Sent exactly once per connection, before any record.
    SchemaDetected(Schema),
    /// One parsed data line.
    Record(Record),
    /// The byte source failed; the ingestion loop has stopped.
    SourceFailed(String),
}

/// Producer half. Deliberately not `Clone`: one ingestion loop per queue.
pub struct RecordSink {
    tx: Sender<IngestMessage>,
}

impl RecordSink {
    pub fn send_schema(&self, schema: Schema) -> Result<(), SendError<IngestMessage>> {
        self.tx.send(IngestMessage::SchemaDetected(schema))
    }

    pub fn send_record(&self, record: Record) -> Result<(), SendError<IngestMessage>> {
        self.tx.send(IngestMessage::Record(record))
    }

    pub fn send_failure<S: Into<String>>(&self, reason: S) -> Result<(), SendError<IngestMessage>> {
        self.tx.send(IngestMessage::SourceFailed(reason.into()))
    }

    pub fn send(&self, msg: IngestMessage) -> Result<(), SendError<IngestMessage>> {
        self.tx.send(msg)
    }
}

/// Consumer half, drained once per render tick.
pub struct RecordQueue {
    rx: Receiver<IngestMessage>,
    disconnected: bool,
}

impl RecordQueue {
    /// Take queued messages until `limit` records have been taken or the queue is empty.
    ///
    /// Schema and failure notices ride along without counting toward `limit`.
    pub fn drain_batch(&mut self, limit: usize) -> Vec<IngestMessage> {
        let mut out = Vec::new();
        let mut records = 0;
        while records < limit {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if matches!(msg, IngestMessage::Record(_)) {
                        records += 1;
                    }
                    out.push(msg);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        out
    }

    /// Discard everything queued; returns how many messages were dropped.
    pub fn flush(&mut self) -> usize {
        let mut dropped = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) => dropped += 1,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        dropped
    }

    /// True once the producer is gone and everything it sent has been drained.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// Create a new channel pair: `(RecordSink, RecordQueue)`.
pub fn channel_records() -> (RecordSink, RecordQueue) {
    let (tx, rx) = std::sync::mpsc::channel();
    (
        RecordSink { tx },
        RecordQueue {
            rx,
            disconnected: false,
        },
    )
}

/// Receives the output of each render tick.
pub trait RenderSink {
    /// Called once per connection when the header line has been found.
    fn on_schema_detected(&mut self, columns: &[String]);

    /// Called on every tick that produced an update.
    fn on_frame(&mut self, frame: &Frame);
}

/// A sink that keeps what it was given; handy for headless hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub schemas: Vec<Vec<String>>,
    pub frames: Vec<Frame>,
}

impl CollectingSink {
    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

impl RenderSink for CollectingSink {
    fn on_schema_detected(&mut self, columns: &[String]) {
        self.schemas.push(columns.to_vec());
    }

    fn on_frame(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }
}
