//! Byte sources feeding the ingestion loop.
//!
//! The core only needs [`ByteSource::read_available`], which must not block.
//! [`ReaderSource`] adapts any [`Read`] (a tty already configured by the OS, a
//! pipe, a file, stdin) by reading on a helper thread.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

/// A non-blocking supplier of raw bytes.
pub trait ByteSource: Send {
    /// Return whatever bytes arrived since the last call (possibly none).
    fn read_available(&mut self) -> io::Result<Vec<u8>>;
}

/// Opens a [`ByteSource`] for an address. Closing is dropping the source.
pub trait SourceOpener {
    fn open(&self, address: &str) -> io::Result<Box<dyn ByteSource>>;
}

impl<F> SourceOpener for F
where
    F: Fn(&str) -> io::Result<Box<dyn ByteSource>>,
{
    fn open(&self, address: &str) -> io::Result<Box<dyn ByteSource>> {
        self(address)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ReaderSource
// ─────────────────────────────────────────────────────────────────────────────

const READ_CHUNK: usize = 4096;
/// Sleep between reads while a non-blocking reader has nothing.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Drains a reader on its own thread and hands out what arrived.
///
/// End of input is not a failure: the source simply stays quiet afterwards.
/// Dropping the source closes it: the helper thread stops reading and drops
/// the reader. A non-blocking reader (see [`PathOpener`]) is released within
/// one idle poll; a blocking one once its pending read returns.
pub struct ReaderSource {
    rx: Receiver<io::Result<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    // Error held back so bytes read before it are delivered first.
    deferred: Option<io::Error>,
    ended: bool,
}

impl ReaderSource {
    pub fn spawn<R>(name: &str, mut reader: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = std::sync::mpsc::channel();
        let closed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&closed);
        let label = name.to_string();
        thread::Builder::new()
            .name(format!("serialscope-read:{name}"))
            .spawn(move || {
                let mut buf = vec![0u8; READ_CHUNK];
                while !flag.load(Ordering::Acquire) {
                    match reader.read(&mut buf) {
                        Ok(0) => {
                            debug!(source = %label, "end of input");
                            break;
                        }
                        Ok(n) => {
                            // bytes read after close belong to nobody
                            if flag.load(Ordering::Acquire)
                                || tx.send(Ok(buf[..n].to_vec())).is_err()
                            {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                            thread::sleep(IDLE_POLL)
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
                debug!(source = %label, "reader released");
            })?;
        Ok(Self {
            rx,
            closed,
            deferred: None,
            ended: false,
        })
    }

    /// True once the reader hit end of input and every chunk was handed out.
    pub fn has_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for ReaderSource {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl ByteSource for ReaderSource {
    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(Ok(chunk)) => out.extend_from_slice(&chunk),
                Ok(Err(e)) => {
                    if out.is_empty() {
                        return Err(e);
                    }
                    self.deferred = Some(e);
                    return Ok(out);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.ended = true;
                    break;
                }
            }
        }
        Ok(out)
    }
}

/// Opens filesystem paths (device nodes, pipes, files); `-` means stdin.
///
/// On Unix paths are opened non-blocking so that dropping the source releases
/// a quiet device right away.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathOpener;

#[cfg(unix)]
fn open_path(address: &str) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(address)
}

#[cfg(not(unix))]
fn open_path(address: &str) -> io::Result<File> {
    OpenOptions::new().read(true).open(address)
}

impl SourceOpener for PathOpener {
    fn open(&self, address: &str) -> io::Result<Box<dyn ByteSource>> {
        if address == "-" {
            return Ok(Box::new(ReaderSource::spawn("stdin", io::stdin())?));
        }
        let file = open_path(address)?;
        Ok(Box::new(ReaderSource::spawn(address, file)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScriptedSource
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Bytes(Vec<u8>),
    Fail(io::ErrorKind, String),
}

/// Replays canned chunks, one per read, then stays quiet.
///
/// Used for demos and tests where a real device is not available.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk to be returned by a single read.
    pub fn chunk<B: AsRef<[u8]>>(mut self, bytes: B) -> Self {
        self.steps.push_back(Step::Bytes(bytes.as_ref().to_vec()));
        self
    }

    /// Queue each line as its own newline-terminated chunk.
    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let mut bytes = line.as_ref().as_bytes().to_vec();
            bytes.push(b'\n');
            self.steps.push_back(Step::Bytes(bytes));
        }
        self
    }

    /// Queue a read failure.
    pub fn fail<S: Into<String>>(mut self, reason: S) -> Self {
        self.steps
            .push_back(Step::Fail(io::ErrorKind::BrokenPipe, reason.into()));
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl ByteSource for ScriptedSource {
    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        match self.steps.pop_front() {
            Some(Step::Bytes(b)) => Ok(b),
            Some(Step::Fail(kind, msg)) => Err(io::Error::new(kind, msg)),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// A device with nothing to say; records when it is closed.
    struct QuietDevice {
        released: Arc<AtomicBool>,
    }

    impl Read for QuietDevice {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    impl Drop for QuietDevice {
        fn drop(&mut self) {
            self.released.store(true, Ordering::Release);
        }
    }

    fn wait_for(flag: &AtomicBool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !flag.load(Ordering::Acquire) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        flag.load(Ordering::Acquire)
    }

    fn read_until(src: &mut ReaderSource, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut got = Vec::new();
        while got.len() < want && Instant::now() < deadline {
            got.extend(src.read_available().unwrap());
            thread::sleep(Duration::from_millis(1));
        }
        got
    }

    #[test]
    fn reader_source_forwards_bytes_and_ends_quietly() {
        let data = b"a,b\n1,2\n".to_vec();
        let mut src = ReaderSource::spawn("mem", io::Cursor::new(data.clone())).unwrap();
        assert_eq!(read_until(&mut src, data.len()), data);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !src.has_ended() && Instant::now() < deadline {
            assert!(src.read_available().unwrap().is_empty());
            thread::sleep(Duration::from_millis(1));
        }
        assert!(src.has_ended());
    }

    #[test]
    fn dropping_the_source_releases_a_quiet_device() {
        let released = Arc::new(AtomicBool::new(false));
        let device = QuietDevice {
            released: Arc::clone(&released),
        };
        let mut src = ReaderSource::spawn("quiet", device).unwrap();
        assert!(src.read_available().unwrap().is_empty());
        assert!(!released.load(Ordering::Acquire));
        drop(src);
        assert!(wait_for(&released), "device still held after the source was dropped");
    }

    #[test]
    fn path_opener_reads_regular_files() {
        let path = std::env::temp_dir().join(format!("serialscope-src-{}.csv", std::process::id()));
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        let mut src = PathOpener.open(path.to_str().unwrap()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut got = Vec::new();
        while got.len() < 8 && Instant::now() < deadline {
            got.extend(src.read_available().unwrap());
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(got, b"a,b\n1,2\n");
        drop(src);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn scripted_source_replays_in_order() {
        let mut src = ScriptedSource::new().chunk("ab").fail("unplugged").lines(["x"]);
        assert_eq!(src.read_available().unwrap(), b"ab");
        assert_eq!(
            src.read_available().unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert_eq!(src.read_available().unwrap(), b"x\n");
        assert!(src.read_available().unwrap().is_empty());
    }

    #[test]
    fn path_opener_reports_missing_device() {
        assert!(PathOpener.open("/nonexistent/ttyUSB9").is_err());
    }
}
