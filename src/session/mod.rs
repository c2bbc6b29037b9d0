//! The owned connection to the local store and its sync workers.
//!
//! Only one live session may hold a given store path at a time. Closing a
//! session stops every sync worker before the store handle is released.

use anyhow::{anyhow, bail, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{info, warn};

use crate::db::{Collection, Database};
use crate::error::FinanceError;
use crate::settings::{Settings, SYNC_TOKEN};
use crate::sync::{start_sync, SyncChange, SyncHandle, SyncOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Something the UI should react to: report sync health or reload views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    Liveness { collection: Collection, alive: bool },
    Changed(SyncChange),
}

fn open_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static OPEN: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    OPEN.get_or_init(|| Mutex::new(HashSet::new()))
}

fn register(path: &Path) -> Result<()> {
    let mut open = open_paths()
        .lock()
        .map_err(|_| anyhow!("Store registry lock poisoned"))?;
    if !open.insert(path.to_path_buf()) {
        bail!("Store is already open: {}", path.display());
    }
    Ok(())
}

fn unregister(path: &Path) {
    if let Ok(mut open) = open_paths().lock() {
        open.remove(path);
    }
}

pub(crate) struct Session {
    path: PathBuf,
    settings: Arc<dyn Settings>,
    options: SyncOptions,
    state: ConnectionState,
    registered: bool,
    db: Option<Database>,
    syncs: Vec<SyncHandle>,
}

impl Session {
    pub(crate) fn connect(path: &Path, settings: Arc<dyn Settings>) -> Self {
        Self::connect_with(path, settings, SyncOptions::default())
    }

    /// Open the store at `path`. Failures leave the session `Failed`
    /// rather than returning an error; call `reconnect` to retry.
    pub(crate) fn connect_with(
        path: &Path,
        settings: Arc<dyn Settings>,
        options: SyncOptions,
    ) -> Self {
        let mut session = Self {
            path: path.to_path_buf(),
            settings,
            options,
            state: ConnectionState::Disconnected,
            registered: false,
            db: None,
            syncs: Vec::new(),
        };
        session.reconnect();
        session
    }

    /// Tear down whatever is open and connect again.
    pub(crate) fn reconnect(&mut self) -> ConnectionState {
        self.close();
        self.state = ConnectionState::Connecting;
        match self.open() {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!(path = %self.path.display(), syncing = !self.syncs.is_empty(), "session connected");
            }
            Err(err) => {
                warn!(path = %self.path.display(), "Failed to connect: {err:#}");
                self.close();
                self.state = ConnectionState::Failed;
            }
        }
        self.state
    }

    fn open(&mut self) -> Result<()> {
        register(&self.path)?;
        self.registered = true;

        let db = Database::open(&self.path)?;
        db.ensure_collections()?;

        let token = self.settings.get(SYNC_TOKEN);
        if !token.trim().is_empty() {
            for collection in Collection::all() {
                match start_sync(
                    &db,
                    *collection,
                    &token,
                    Arc::clone(&self.settings),
                    self.options,
                ) {
                    Ok(handle) => self.syncs.push(handle),
                    Err(err) => {
                        // Local work goes on without sync.
                        warn!(%collection, "Sync disabled: {err:#}");
                        self.syncs.clear();
                        break;
                    }
                }
            }
        }

        self.db = Some(db);
        Ok(())
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    pub(crate) fn db(&self) -> Result<&Database> {
        match (self.state, &self.db) {
            (ConnectionState::Connected, Some(db)) => Ok(db),
            _ => Err(FinanceError::StoreUnavailable.into()),
        }
    }

    pub(crate) fn is_syncing(&self) -> bool {
        !self.syncs.is_empty()
    }

    /// Whether every sync worker currently reaches its remote.
    pub(crate) fn is_online(&self) -> bool {
        self.is_syncing() && self.syncs.iter().all(SyncHandle::is_alive)
    }

    /// Pending liveness and change notifications from every sync worker.
    pub(crate) fn drain_events(&self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for handle in &self.syncs {
            let collection = handle.collection();
            events.extend(
                handle
                    .liveness()
                    .try_iter()
                    .map(|alive| SessionEvent::Liveness { collection, alive }),
            );
            events.extend(handle.changes().try_iter().map(SessionEvent::Changed));
        }
        events
    }

    /// Stop sync, then release the store and its registry entry.
    pub(crate) fn close(&mut self) {
        for handle in self.syncs.drain(..) {
            handle.stop();
        }
        if self.db.take().is_some() {
            info!(path = %self.path.display(), "session closed");
        }
        if self.registered {
            unregister(&self.path);
            self.registered = false;
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
