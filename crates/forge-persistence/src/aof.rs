//! Append-only command log.
//!
//! Mutations are re-encoded as protocol lines and handed to a queue;
//! callers return immediately. A dedicated writer thread drains the
//! queue in batches, appends each record to the log file, and flushes
//! the stream when a batch was written or the flush interval elapsed.
//! A crash can therefore lose up to one flush interval of writes.
//!
//! Two independent switches control the log:
//!
//! - the `enabled` gate silences `log_*` during replay, so the records
//!   being read back are not appended a second time;
//! - the `stopped` latch makes shutdown idempotent: once `stop` is
//!   requested, further records are discarded and the writer drains
//!   what is already queued before exiting.
//!
//! The writer runs as a plain `std::thread`; file I/O with a blocking
//! timed wait has no business on the async executor.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info};

use forge_protocol::quote;

/// How long the writer waits for new records before flushing anyway.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Queued append-only log writer.
///
/// Shared behind an `Arc`; every method takes `&self`.
pub struct AofWriter {
    path: PathBuf,
    flush_interval: Duration,
    tx: Mutex<Option<Sender<String>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    enabled: AtomicBool,
    stopped: AtomicBool,
    pending: Arc<AtomicUsize>,
    written: Arc<AtomicU64>,
}

impl AofWriter {
    /// Creates a writer for the given log path. No file is opened and
    /// no thread is spawned until [`start`](Self::start).
    pub fn new(path: impl Into<PathBuf>, flush_interval: Duration) -> Self {
        Self {
            path: path.into(),
            flush_interval,
            tx: Mutex::new(None),
            handle: Mutex::new(None),
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            pending: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Opens the log file in append mode and starts the writer thread.
    pub fn start(&self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let (tx, rx) = mpsc::channel::<String>();
        let interval = self.flush_interval;
        let pending = Arc::clone(&self.pending);
        let written = Arc::clone(&self.written);

        let handle = std::thread::Builder::new()
            .name("forge-aof".into())
            .spawn(move || writer_loop(rx, BufWriter::new(file), interval, &pending, &written))?;

        *self.tx.lock() = Some(tx);
        *self.handle.lock() = Some(handle);
        info!(path = %self.path.display(), "append log started");
        Ok(())
    }

    /// Latches the stop flag, lets the writer drain the remaining
    /// queue, flush, and exit, then joins it. Idempotent; records
    /// logged after this point are silently discarded.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        // dropping the sender is the writer's shutdown signal; it keeps
        // receiving queued records until the channel reports empty
        self.tx.lock().take();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }

    /// Gates logging on or off. Replay turns the gate off so records
    /// being read back are not re-appended.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Records not yet handed to the file.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Records successfully written (counted before flush).
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_set(&self, key: &str, value: &str) {
        self.enqueue(format!("SET {} {}", quote(key), quote(value)));
    }

    pub fn log_del(&self, key: &str) {
        self.enqueue(format!("DEL {}", quote(key)));
    }

    pub fn log_expire(&self, key: &str, seconds: i64) {
        self.enqueue(format!("EXPIRE {} {seconds}", quote(key)));
    }

    fn enqueue(&self, record: String) {
        if !self.enabled.load(Ordering::Acquire) || self.stopped.load(Ordering::Acquire) {
            return;
        }
        let tx = self.tx.lock();
        if let Some(tx) = tx.as_ref() {
            self.pending.fetch_add(1, Ordering::Relaxed);
            if tx.send(record).is_err() {
                self.pending.fetch_sub(1, Ordering::Relaxed);
            }
        }
    }
}

impl Drop for AofWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drains the queue in batches and appends them to the file. Exits when
/// the sender side is dropped and the queue is empty. Write errors are
/// logged and the loop continues; records written before the error
/// stay counted.
fn writer_loop(
    rx: Receiver<String>,
    mut file: BufWriter<File>,
    interval: Duration,
    pending: &AtomicUsize,
    written: &AtomicU64,
) {
    let mut last_flush = Instant::now();

    loop {
        let mut batch = Vec::new();
        let mut disconnected = false;

        match rx.recv_timeout(interval) {
            Ok(record) => batch.push(record),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => disconnected = true,
        }
        loop {
            match rx.try_recv() {
                Ok(record) => batch.push(record),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if !batch.is_empty() {
            pending.fetch_sub(batch.len(), Ordering::Relaxed);
        }

        for record in &batch {
            if let Err(e) = writeln!(file, "{record}") {
                error!("append log write failed: {e}");
                break;
            }
            written.fetch_add(1, Ordering::Relaxed);
        }

        let now = Instant::now();
        if !batch.is_empty() || now.duration_since(last_flush) >= interval {
            if let Err(e) = file.flush() {
                error!("append log flush failed: {e}");
            }
            last_flush = now;
        }

        if disconnected {
            if let Err(e) = file.flush() {
                error!("append log flush failed during shutdown: {e}");
            }
            return;
        }
    }
}
