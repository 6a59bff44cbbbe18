//! Merge Scheduler
//!
//! Owns the merge thread and the channels used to wake and stop it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::{Condvar, Mutex};

use crate::buffer::Mutation;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::index::OrderedIndex;
use crate::tiers::Tiers;

/// Name given to the merge thread
const THREAD_NAME: &str = "mergecache-merge";

/// How long `wait_idle` sleeps before re-checking and re-signalling
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Counters exported by the merge worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Mutations applied to the index
    pub merged: u64,

    /// Drain passes that ran until the buffer was empty
    pub drains: u64,

    /// Wake-ups dropped because the signal queue was full
    pub signals_dropped: u64,
}

/// State shared between the scheduler handle and the worker thread
#[derive(Default)]
struct WorkerState {
    /// True while the worker is draining
    busy: Mutex<bool>,

    /// Notified whenever the worker leaves the Draining state
    idle: Condvar,

    /// Set when the worker panicked
    failed: AtomicBool,

    merged: AtomicU64,
    drains: AtomicU64,
    signals_dropped: AtomicU64,
}

impl WorkerState {
    fn set_busy(&self, busy: bool) {
        *self.busy.lock() = busy;
        if !busy {
            self.idle.notify_all();
        }
    }
}

/// Handle to the single background merge worker
///
/// ## Concurrency:
/// - Exactly one worker thread per scheduler, so the index has one writer
/// - `notify` never blocks
/// - `shutdown` joins the worker; it succeeds at most once
pub struct MergeScheduler {
    /// Wake-up channel (bounded, lossy)
    signal_tx: Sender<()>,

    /// Stop channel (capacity 1, sent at most once)
    shutdown_tx: Sender<()>,

    /// Worker thread; `None` once shut down
    handle: Mutex<Option<JoinHandle<()>>>,

    state: Arc<WorkerState>,
}

impl MergeScheduler {
    /// Spawn the merge worker over `tiers`
    pub fn spawn<I: OrderedIndex>(tiers: Arc<Tiers<I>>, config: &Config) -> Result<Self> {
        let (signal_tx, signal_rx) = channel::bounded(config.signal_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let state = Arc::new(WorkerState::default());

        let worker = MergeWorker {
            tiers,
            signal_rx,
            shutdown_rx,
            state: Arc::clone(&state),
            yield_between_merges: config.yield_between_merges,
        };

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .map_err(|e| CacheError::Spawn(e.to_string()))?;

        tracing::debug!(
            signal_capacity = config.signal_capacity,
            "Merge worker started"
        );

        Ok(Self {
            signal_tx,
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
            state,
        })
    }

    /// Ask the worker to drain (best effort, never blocks)
    pub fn notify(&self) {
        match self.signal_tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                self.state.signals_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Merge signal dropped, wake-up already queued");
            }
            Err(TrySendError::Disconnected(())) => {
                tracing::trace!("Merge signal after worker exit");
            }
        }
    }

    /// Block until `is_drained` holds and the worker is idle
    ///
    /// `is_drained` is evaluated with the worker's state lock held, so a
    /// drain that finishes concurrently cannot be missed.
    pub fn wait_idle(&self, is_drained: impl Fn() -> bool) -> Result<()> {
        let mut busy = self.state.busy.lock();
        loop {
            if self.has_failed() {
                return Err(CacheError::MergeFailed);
            }
            if !self.is_running() {
                return Err(CacheError::Closed);
            }
            if !*busy && is_drained() {
                return Ok(());
            }
            // Re-signal in case the buffer refilled after the last drain
            self.notify();
            self.state.idle.wait_for(&mut busy, IDLE_POLL);
        }
    }

    /// Stop the worker and wait for it to exit
    ///
    /// Returns `Closed` if the worker was already shut down and
    /// `MergeFailed` if it died from a panic.
    pub fn shutdown(&self) -> Result<()> {
        let handle = match self.handle.lock().take() {
            Some(handle) => handle,
            None => return Err(CacheError::Closed),
        };

        // Worker may already be gone after a panic; nothing to wake then
        let _ = self.shutdown_tx.send(());

        let joined = handle.join();
        tracing::debug!("Merge worker stopped");

        match joined {
            Ok(()) if !self.has_failed() => Ok(()),
            _ => Err(CacheError::MergeFailed),
        }
    }

    /// True until `shutdown` has been called
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// True if the worker panicked
    pub fn has_failed(&self) -> bool {
        self.state.failed.load(Ordering::Acquire)
    }

    /// Snapshot of the worker counters
    pub fn stats(&self) -> MergeStats {
        MergeStats {
            merged: self.state.merged.load(Ordering::Relaxed),
            drains: self.state.drains.load(Ordering::Relaxed),
            signals_dropped: self.state.signals_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for MergeScheduler {
    fn drop(&mut self) {
        if self.handle.get_mut().is_some() {
            let _ = self.shutdown();
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

/// The merge thread body
struct MergeWorker<I: OrderedIndex> {
    tiers: Arc<Tiers<I>>,
    signal_rx: Receiver<()>,
    shutdown_rx: Receiver<()>,
    state: Arc<WorkerState>,
    yield_between_merges: bool,
}

impl<I: OrderedIndex> MergeWorker<I> {
    fn run(self) {
        let _guard = PanicGuard {
            state: &self.state,
        };

        loop {
            if self.shutdown_requested() {
                break;
            }

            crossbeam::select! {
                recv(self.shutdown_rx) -> _ => break,
                recv(self.signal_rx) -> signal => {
                    if signal.is_err() {
                        break;
                    }
                }
            }

            if !self.drain() {
                break;
            }
        }
    }

    /// Pop and apply until the buffer is empty.
    /// Returns false if shutdown interrupted the drain.
    fn drain(&self) -> bool {
        self.state.set_busy(true);

        let mut applied = 0u64;
        let completed = loop {
            if self.shutdown_requested() {
                break false;
            }

            // Index lock is taken before the partition lock is released
            let popped = self
                .tiers
                .buffer()
                .pop_any_then(|| self.tiers.index().write());

            let (key, mutation, mut index) = match popped {
                Some(popped) => popped,
                None => break true,
            };

            tracing::trace!(
                key = %key,
                kind = mutation.value().map_or("tombstone", |value| value.kind()),
                "Merging mutation"
            );
            match mutation {
                Mutation::Put(value) => index.insert_or_replace(key, value),
                Mutation::Tombstone => index.delete(&key),
            }
            drop(index);

            applied += 1;
            self.state.merged.fetch_add(1, Ordering::Relaxed);

            if self.yield_between_merges {
                thread::yield_now();
            }
        };

        if completed {
            self.state.drains.fetch_add(1, Ordering::Relaxed);
        }
        if applied > 0 {
            tracing::trace!(applied, completed, "Drain pass finished");
        }

        self.state.set_busy(false);
        completed
    }

    fn shutdown_requested(&self) -> bool {
        match self.shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

/// Marks the worker failed if its thread unwinds
struct PanicGuard<'a> {
    state: &'a WorkerState,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!("Merge worker panicked; cache is no longer serviceable");
            self.state.failed.store(true, Ordering::Release);
            self.state.set_busy(false);
        }
    }
}
