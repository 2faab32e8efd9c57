//! Background expiration sweep.
//!
//! A single thread walks the shards round-robin, scanning a bounded
//! number of entries per shard under that shard's lock and reclaiming
//! any that have expired, then naps before the next rotation. The sweep
//! is approximate: it promises eventual reclamation of keys nobody
//! reads, not completeness within one pass.
//!
//! The sweeper runs as a plain `std::thread` rather than a task on the
//! async runtime: it alternates short lock-holding scans with long
//! sleeps, neither of which belongs on an executor worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{trace, warn};

use crate::store::{ShardedStore, NUM_SHARDS};

/// Entries examined per shard per pass. A knob, not a contract: larger
/// values reclaim faster at the cost of longer lock hold times.
const MAX_SCAN_PER_SWEEP: usize = 100;

/// Nap between full rotations over all shards.
const SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Handle to the running sweep thread. Stopping (or dropping) signals
/// cancellation and joins the thread.
pub struct Sweeper {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawns the sweep thread over `store`.
    ///
    /// If the thread cannot be spawned, logs a warning and returns an
    /// inert handle; lazy expiration still keeps reads correct.
    pub fn start(store: Arc<ShardedStore>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let handle = std::thread::Builder::new()
            .name("forge-sweep".into())
            .spawn(move || sweep_loop(&store, &flag));

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("failed to spawn sweep thread, relying on lazy expiration only: {e}");
                None
            }
        };

        Self { shutdown, handle }
    }

    /// Signals cancellation and joins the sweep thread. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Rotates over all shards, checking the cancellation flag between
/// shards and around each nap.
fn sweep_loop(store: &ShardedStore, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Relaxed) {
        for index in 0..NUM_SHARDS {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            let removed = store.sweep_shard(index, MAX_SCAN_PER_SWEEP);
            if removed > 0 {
                trace!(shard = index, removed, "sweep reclaimed expired keys");
            }
        }
        std::thread::sleep(SWEEP_INTERVAL);
    }
}
