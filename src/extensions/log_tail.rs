//! Follow a simulated device's system log
//!
//! A [`LogTail`] owns one background thread that polls the log file for
//! appended data and hands each complete line to a [`LineSink`]. Everything
//! the thread observes is also published as a [`TailEvent`] on a crossbeam
//! channel, ending with exactly one terminal event. The last slot of the
//! channel is reserved for that event, so it arrives even when nobody drains
//! the stream.
//!
//! # States
//!
//! - [`TailState::Active`] - The thread is following the file
//! - [`TailState::Stopped`] - Stopped on request (or the handle was dropped)
//! - [`TailState::Errored`] - The sink rejected a line; nothing more is read
//!
//! Read errors on the log file itself are logged and published as
//! [`TailEvent::Error`] but do not end the tail.
//!
//! # File Handling
//!
//! - Only data appended after [`LogTail::spawn`] returns is delivered
//! - A file that does not exist yet is waited for and read from its start
//! - Truncation or replacement (a new inode at the same path) rewinds to the
//!   start of the new content
//! - A trailing partial line is held back until its newline arrives

use crate::error::{Result, ResultExt, SimctlError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::fs::{File, Metadata, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Capacity of the event channel, including the slot kept for the terminal event
pub const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Write `line` plus `\n` to `writer` in one call and flush it
pub fn write_line_to<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    let mut data = String::with_capacity(line.len() + 1);
    data.push_str(line);
    data.push('\n');

    writer.write_all(data.as_bytes())?;
    writer.flush()
}

/// Device and inode of a file, used to notice replacement
#[cfg(unix)]
fn file_identity(meta: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_identity(_meta: &Metadata) -> Option<(u64, u64)> {
    None
}

/// Where tailed lines are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSink {
    /// Print each line to stdout
    Console,
    /// Append each line plus `\n` to a file, creating it if needed
    File(PathBuf),
}

impl LineSink {
    /// Console sink unless a destination file is given
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(LineSink::File).unwrap_or(LineSink::Console)
    }

    /// Deliver one line
    pub fn write_line(&self, line: &str) -> Result<()> {
        match self {
            LineSink::Console => write_line_to(&mut io::stdout().lock(), line)
                .map_err(|e| SimctlError::Sink(format!("stdout: {}", e))),
            LineSink::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| SimctlError::Sink(format!("{}: {}", path.display(), e)))?;

                write_line_to(&mut file, line)
                    .map_err(|e| SimctlError::Sink(format!("{}: {}", path.display(), e)))
            }
        }
    }
}

/// Notification published by the tail thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// A complete line was read and delivered to the sink
    Line(String),
    /// Reading the log failed; the tail keeps going
    Error(String),
    /// Terminal: the sink failed and the tail ended
    Failed(String),
    /// Terminal: the tail was stopped
    Stopped,
}

impl TailEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TailEvent::Failed(_) | TailEvent::Stopped)
    }
}

/// Lifecycle of a tail subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailState {
    Active,
    Stopped,
    Errored(String),
}

/// Handle to a live log tail
///
/// Dropping the handle stops the thread and waits for it to exit.
pub struct LogTail {
    path: PathBuf,
    events: Receiver<TailEvent>,
    stop_tx: Option<Sender<()>>,
    state: Arc<Mutex<TailState>>,
    handle: Option<JoinHandle<()>>,
}

impl LogTail {
    /// Start following `path`, delivering new lines to `sink`
    pub fn spawn(path: impl Into<PathBuf>, sink: LineSink, poll_interval: Duration) -> Result<Self> {
        let path = path.into();

        // Position is fixed before returning so lines appended afterwards
        // are never skipped.
        let (position, identity) = match std::fs::metadata(&path) {
            Ok(meta) => (Some(meta.len()), file_identity(&meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("{} does not exist yet, waiting for it", path.display());
                (None, None)
            }
            Err(e) => {
                tracing::error!("Cannot stat {}: {}", path.display(), e);
                (None, None)
            }
        };

        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = bounded(1);
        let state = Arc::new(Mutex::new(TailState::Active));

        let worker = TailWorker {
            path: path.clone(),
            sink,
            poll_interval,
            stop_rx,
            events: event_tx,
            state: state.clone(),
            position,
            identity,
            pending: Vec::new(),
            last_error: None,
        };

        let handle = std::thread::Builder::new()
            .name("simctl-log-tail".to_string())
            .spawn(move || worker.run())
            .with_context(|| format!("Spawning log tail for {}", path.display()))?;

        Ok(Self {
            path,
            events: event_rx,
            stop_tx: Some(stop_tx),
            state,
            handle: Some(handle),
        })
    }

    /// The file being followed
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Event stream; ends with one terminal event
    pub fn events(&self) -> &Receiver<TailEvent> {
        &self.events
    }

    pub fn state(&self) -> TailState {
        lock_state(&self.state).clone()
    }

    pub fn is_active(&self) -> bool {
        self.state() == TailState::Active
    }

    /// Stop the tail, wait for the thread and return the final state
    pub fn stop(mut self) -> TailState {
        self.shutdown();
        self.state()
    }

    fn shutdown(&mut self) {
        // Disconnecting the stop channel wakes the thread immediately.
        self.stop_tx.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Log tail thread for {} panicked", self.path.display());
                *lock_state(&self.state) = TailState::Errored("tail thread panicked".to_string());
            }
        }
    }
}

impl Drop for LogTail {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LogTail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogTail")
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

fn lock_state(state: &Mutex<TailState>) -> std::sync::MutexGuard<'_, TailState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Why a poll ended early
enum PollError {
    /// The log could not be read; retried on the next poll
    Read(io::Error),
    /// The sink rejected a line; the tail ends
    Sink(SimctlError),
}

impl From<io::Error> for PollError {
    fn from(e: io::Error) -> Self {
        PollError::Read(e)
    }
}

struct TailWorker {
    path: PathBuf,
    sink: LineSink,
    poll_interval: Duration,
    stop_rx: Receiver<()>,
    events: Sender<TailEvent>,
    state: Arc<Mutex<TailState>>,
    /// Byte offset of the next unread byte, `None` while the file is absent
    position: Option<u64>,
    /// Identity of the file `position` refers to
    identity: Option<(u64, u64)>,
    pending: Vec<u8>,
    last_error: Option<String>,
}

impl TailWorker {
    fn run(mut self) {
        tracing::info!("Log tail started: {}", self.path.display());

        let failure = loop {
            match self.poll() {
                Ok(()) => self.last_error = None,
                Err(PollError::Read(e)) => self.report_read_error(e),
                Err(PollError::Sink(e)) => break Some(e.to_string()),
            }

            match self.stop_rx.recv_timeout(self.poll_interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break None,
            }
        };

        match failure {
            Some(message) => {
                tracing::error!("Log tail for {} failed: {}", self.path.display(), message);
                *lock_state(&self.state) = TailState::Errored(message.clone());
                self.emit(TailEvent::Failed(message));
            }
            None => {
                tracing::info!("Log tail stopped: {}", self.path.display());
                *lock_state(&self.state) = TailState::Stopped;
                self.emit(TailEvent::Stopped);
            }
        }
    }

    fn poll(&mut self) -> std::result::Result<(), PollError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.identity = None;
                if self.position.take().is_some() {
                    tracing::debug!("{} disappeared", self.path.display());
                    self.pending.clear();
                }
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let meta = file.metadata()?;
        let len = meta.len();
        let identity = file_identity(&meta);
        let replaced = self.identity.is_some() && identity != self.identity;
        self.identity = identity;

        let start = match self.position {
            Some(_) if replaced => {
                tracing::debug!("{} was replaced, rewinding", self.path.display());
                self.pending.clear();
                0
            }
            Some(pos) if len < pos => {
                tracing::debug!("{} was truncated, rewinding", self.path.display());
                self.pending.clear();
                0
            }
            Some(pos) => pos,
            None => 0,
        };

        self.position = Some(start);
        if len == start {
            return Ok(());
        }

        file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::with_capacity((len - start) as usize);
        let read = (&mut file).take(len - start).read_to_end(&mut buf)?;
        self.position = Some(start + read as u64);
        self.pending.extend_from_slice(&buf);

        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            let mut line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }

            self.sink.write_line(&line).map_err(PollError::Sink)?;
            self.publish(TailEvent::Line(line));
        }

        Ok(())
    }

    fn report_read_error(&mut self, e: io::Error) {
        let message = format!("{}: {}", self.path.display(), e);
        if self.last_error.as_deref() == Some(message.as_str()) {
            return;
        }

        tracing::error!("Log tail read error: {}", message);
        self.publish(TailEvent::Error(message.clone()));
        self.last_error = Some(message);
    }

    /// Publish a non-terminal event, leaving the last slot free
    ///
    /// This thread is the only sender, so the slot checked here cannot be
    /// taken before the terminal event is sent.
    fn publish(&self, event: TailEvent) {
        if self.events.len() + 1 >= EVENT_CHANNEL_CAPACITY {
            tracing::trace!("Tail event channel full, dropping {:?}", event);
            return;
        }
        self.emit(event);
    }

    fn emit(&self, event: TailEvent) {
        if let Err(TrySendError::Full(event)) = self.events.try_send(event) {
            tracing::trace!("Tail event channel full, dropping {:?}", event);
        }
    }
}
