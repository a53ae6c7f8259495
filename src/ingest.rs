//! Ingestion: bytes in, schema and records out.
//!
//! [`Ingestor`] is the synchronous pipeline (line assembly, header detection,
//! record parsing) with one explicit [`LineOutcome`] per line. [`spawn_ingestion`]
//! runs it on a dedicated thread against a [`ByteSource`], forwarding results
//! through a [`RecordSink`] until the run flag is cleared.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::ScopeConfig;
use crate::data::lines::LineAssembler;
use crate::data::record::{ParseOutcome, Record, RecordParser};
use crate::data::schema::{Schema, SchemaDetector};
use crate::sink::{IngestMessage, RecordSink};
use crate::source::ByteSource;

/// What happened to one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Empty,
    /// Matched the diagnostic denylist.
    Noise,
    /// Arrived before the header and did not look like one.
    Preamble,
    SchemaDetected(Schema),
    Record(Record),
    /// Field count did not match the schema.
    Discarded { expected: usize, found: usize },
}

impl LineOutcome {
    /// The message to forward to the render side, if any.
    pub fn into_message(self) -> Option<IngestMessage> {
        match self {
            LineOutcome::SchemaDetected(s) => Some(IngestMessage::SchemaDetected(s)),
            LineOutcome::Record(r) => Some(IngestMessage::Record(r)),
            _ => None,
        }
    }
}

/// Per-connection pipeline state.
#[derive(Debug)]
pub struct Ingestor {
    assembler: LineAssembler,
    detector: SchemaDetector,
    parser: RecordParser,
}

impl Ingestor {
    pub fn new(cfg: &ScopeConfig) -> Self {
        Self {
            assembler: LineAssembler::new(),
            detector: SchemaDetector::from_config(cfg),
            parser: RecordParser::new(cfg.separator),
        }
    }

    /// Classify one already-assembled line.
    pub fn classify_line(&mut self, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Empty;
        }
        if self.detector.is_noise(line) {
            return LineOutcome::Noise;
        }
        let Some(schema) = self.detector.schema() else {
            return match self.detector.try_establish(line) {
                Some(schema) => LineOutcome::SchemaDetected(schema),
                None => LineOutcome::Preamble,
            };
        };
        match self.parser.parse(line, schema) {
            ParseOutcome::Accepted(record) => LineOutcome::Record(record),
            ParseOutcome::Discarded { expected, found } => {
                LineOutcome::Discarded { expected, found }
            }
        }
    }

    /// Feed a chunk of bytes and classify every line it completed.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<LineOutcome> {
        self.assembler.push(chunk);
        let mut out = Vec::new();
        while let Some(line) = self.assembler.next_line() {
            out.push(self.classify_line(&line));
        }
        out
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.detector.schema()
    }

    /// Forget the schema and any partial line.
    pub fn reset(&mut self) {
        self.assembler.reset();
        self.detector.reset();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingestion loop
// ─────────────────────────────────────────────────────────────────────────────

/// Why [`run_ingestion`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestExit {
    /// The run flag was cleared.
    Stopped,
    /// The render side dropped its queue.
    QueueClosed,
    /// The source failed; a failure notice was sent.
    SourceFailed(String),
}

/// Timing knobs of the ingestion loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub settle_delay: Duration,
}

impl From<&ScopeConfig> for LoopTiming {
    fn from(cfg: &ScopeConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            error_backoff: cfg.error_backoff(),
            settle_delay: cfg.settle_delay(),
        }
    }
}

/// Sleep for `total`, waking every `slice` to check `running`.
fn sleep_while_running(running: &AtomicBool, total: Duration, slice: Duration) {
    let deadline = Instant::now() + total;
    let slice = slice.max(Duration::from_millis(1));
    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(slice.min(deadline - now));
    }
}

/// Read, parse and forward until stopped, the queue closes, or the source fails.
pub fn run_ingestion(
    source: &mut dyn ByteSource,
    ingestor: &mut Ingestor,
    sink: &RecordSink,
    running: &AtomicBool,
    timing: LoopTiming,
) -> IngestExit {
    if !timing.settle_delay.is_zero() {
        debug!(delay_ms = timing.settle_delay.as_millis() as u64, "waiting for device to settle");
        sleep_while_running(running, timing.settle_delay, Duration::from_millis(10));
    }

    while running.load(Ordering::Acquire) {
        match source.read_available() {
            Ok(bytes) if !bytes.is_empty() => {
                for outcome in ingestor.ingest(&bytes) {
                    match &outcome {
                        LineOutcome::SchemaDetected(schema) => {
                            info!(columns = ?schema.columns(), "CSV header detected");
                        }
                        LineOutcome::Discarded { expected, found } => {
                            trace!(expected, found, "discarding line with wrong field count");
                        }
                        LineOutcome::Noise | LineOutcome::Preamble => {
                            trace!(?outcome, "skipping line");
                        }
                        LineOutcome::Empty | LineOutcome::Record(_) => {}
                    }
                    if let Some(msg) = outcome.into_message() {
                        if sink.send(msg).is_err() {
                            debug!("record queue closed, stopping ingestion");
                            return IngestExit::QueueClosed;
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "error reading data");
                thread::sleep(timing.error_backoff);
                let reason = e.to_string();
                let _ = sink.send_failure(reason.clone());
                return IngestExit::SourceFailed(reason);
            }
        }
        thread::sleep(timing.poll_interval);
    }
    IngestExit::Stopped
}

/// A running ingestion thread. Dropping the handle asks it to stop but does not wait.
pub struct IngestHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<IngestExit>>,
}

impl IngestHandle {
    /// Ask the loop to exit; it notices within one poll interval.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop and wait for the loop to exit.
    pub fn join(mut self) -> Option<IngestExit> {
        self.stop();
        self.thread.take().and_then(|t| t.join().ok())
    }
}

impl Drop for IngestHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the ingestion loop for one connection on its own thread.
pub fn spawn_ingestion(
    address: &str,
    mut source: Box<dyn ByteSource>,
    sink: RecordSink,
    cfg: &ScopeConfig,
) -> io::Result<IngestHandle> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let timing = LoopTiming::from(cfg);
    let mut ingestor = Ingestor::new(cfg);
    let label = address.to_string();
    let thread = thread::Builder::new()
        .name("serialscope-ingest".into())
        .spawn(move || {
            let exit = run_ingestion(source.as_mut(), &mut ingestor, &sink, &flag, timing);
            debug!(address = %label, ?exit, "ingestion loop finished");
            exit
        })?;
    Ok(IngestHandle {
        running,
        thread: Some(thread),
    })
}
