//! Continuous two-way replication between the local store and a remote.
//!
//! Each collection gets its own worker thread. A cycle pulls remote changes
//! after the saved checkpoint, pushes local changes, and records both
//! cursors. Failures flip liveness off and retry with backoff.

mod remote;

pub(crate) use remote::{Remote, RemoteTarget};

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::db::{Collection, Database};
use crate::settings::{Settings, LAST_SYNC_DATE};

/// Documents moved by one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SyncChange {
    pub collection: Collection,
    pub pulled: usize,
    pub pushed: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SyncOptions {
    /// Pause between successful cycles.
    pub interval: Duration,
    /// Longest pause after repeated failures.
    pub max_backoff: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// A running replication for one collection. Dropping it stops the worker.
pub(crate) struct SyncHandle {
    collection: Collection,
    alive: Arc<AtomicBool>,
    liveness: Receiver<bool>,
    changes: Receiver<SyncChange>,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub(crate) fn collection(&self) -> Collection {
        self.collection
    }

    /// One event per liveness transition.
    pub(crate) fn liveness(&self) -> &Receiver<bool> {
        &self.liveness
    }

    /// One event per cycle that moved documents in either direction.
    pub(crate) fn changes(&self) -> &Receiver<SyncChange> {
        &self.changes
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop the worker and wait for it to finish its current cycle.
    pub(crate) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the worker out of its pause.
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(collection = %self.collection, "sync worker panicked");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start replicating `collection` with the remote named by `token`.
///
/// A malformed token fails here. Transport problems surface later as
/// liveness events.
pub(crate) fn start_sync(
    db: &Database,
    collection: Collection,
    token: &str,
    settings: Arc<dyn Settings>,
    options: SyncOptions,
) -> Result<SyncHandle> {
    let target = RemoteTarget::parse(token)?;
    let alive = Arc::new(AtomicBool::new(false));
    let (liveness_tx, liveness) = mpsc::channel();
    let (changes_tx, changes) = mpsc::channel();
    let (stop, stop_rx) = mpsc::channel();

    let mut worker = Worker {
        db: db.clone(),
        collection,
        token: token.trim().to_string(),
        target,
        remote: None,
        settings,
        options,
        alive: Arc::clone(&alive),
        last_liveness: None,
        liveness: liveness_tx,
        changes: changes_tx,
    };
    let handle = std::thread::Builder::new()
        .name(format!("sync-{collection}"))
        .spawn(move || worker.run(&stop_rx))
        .map_err(|err| anyhow!("Failed to start {collection} sync: {err}"))?;
    info!(%collection, "sync started");

    Ok(SyncHandle {
        collection,
        alive,
        liveness,
        changes,
        stop: Some(stop),
        worker: Some(handle),
    })
}

/// Run one pull-then-push cycle. Returns (pulled, pushed).
pub(crate) fn sync_once(
    db: &Database,
    remote: &mut dyn Remote,
    collection: Collection,
    token: &str,
) -> Result<(usize, usize)> {
    let (pulled_seq, pushed_seq) = db.checkpoint(collection, token)?;

    let incoming = remote.changes(collection, pulled_seq)?;
    let pulled = db.apply_revisions(collection, &incoming.results)?;

    // Skip echoing back what was just pulled.
    let seen: HashSet<(&str, &str)> = incoming
        .results
        .iter()
        .map(|rev| (rev.id.as_str(), rev.rev.as_str()))
        .collect();
    let outgoing = db.changes_since(collection, pushed_seq)?;
    let to_push: Vec<_> = outgoing
        .results
        .into_iter()
        .filter(|rev| !seen.contains(&(rev.id.as_str(), rev.rev.as_str())))
        .collect();
    let pushed = if to_push.is_empty() {
        0
    } else {
        remote.apply(collection, &to_push)?
    };

    db.save_checkpoint(collection, token, incoming.last_seq, outgoing.last_seq)?;
    Ok((pulled, pushed))
}

struct Worker {
    db: Database,
    collection: Collection,
    token: String,
    target: RemoteTarget,
    remote: Option<Box<dyn Remote>>,
    settings: Arc<dyn Settings>,
    options: SyncOptions,
    alive: Arc<AtomicBool>,
    last_liveness: Option<bool>,
    liveness: Sender<bool>,
    changes: Sender<SyncChange>,
}

impl Worker {
    fn run(&mut self, stop: &Receiver<()>) {
        let mut failures: u32 = 0;
        loop {
            let pause = match self.attempt() {
                Ok((pulled, pushed)) => {
                    failures = 0;
                    let revived = self.set_alive(true);
                    let moved = pulled + pushed > 0;
                    if moved {
                        debug!(collection = %self.collection, pulled, pushed, "sync cycle moved documents");
                        let _ = self.changes.send(SyncChange {
                            collection: self.collection,
                            pulled,
                            pushed,
                        });
                    }
                    if revived || moved {
                        self.record_sync_date();
                    }
                    self.options.interval
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    self.remote = None;
                    warn!(collection = %self.collection, failures, "sync failed: {err:#}");
                    self.set_alive(false);
                    backoff(self.options, failures)
                }
            };

            match stop.recv_timeout(pause) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.set_alive(false);
        info!(collection = %self.collection, "sync stopped");
    }

    fn attempt(&mut self) -> Result<(usize, usize)> {
        if self.remote.is_none() {
            self.remote = Some(self.target.connect()?);
        }
        let remote = self
            .remote
            .as_deref_mut()
            .ok_or_else(|| anyhow!("Remote unavailable"))?;
        sync_once(&self.db, remote, self.collection, &self.token)
    }

    /// Returns true when this call turned liveness on.
    fn set_alive(&mut self, alive: bool) -> bool {
        if self.last_liveness == Some(alive) {
            return false;
        }
        self.last_liveness = Some(alive);
        self.alive.store(alive, Ordering::SeqCst);
        let _ = self.liveness.send(alive);
        alive
    }

    fn record_sync_date(&self) {
        let now = Utc::now().to_rfc3339();
        if let Err(err) = self.settings.set(LAST_SYNC_DATE, &now) {
            warn!("Failed to record sync date: {err:#}");
        }
    }
}

fn backoff(options: SyncOptions, failures: u32) -> Duration {
    let factor = 1u32 << failures.min(16);
    options
        .interval
        .saturating_mul(factor)
        .min(options.max_backoff)
}
