//! Whole-dataset export, import and wipe.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::db::{erase_file, Collection, Database};
use crate::models::{Budget, Expense};
use crate::session::{ConnectionState, Session};
use crate::settings::SYNC_TOKEN;
use crate::sync::RemoteTarget;

/// The backup file format: `{ "budgets": [...], "expenses": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ExportPayload {
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

/// Every live record, budgets by name and expenses oldest first.
pub(crate) fn export(db: &Database) -> Result<ExportPayload> {
    let mut budgets: Vec<Budget> = db.find_many(&[])?;
    budgets.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.month.cmp(&b.month))
            .then_with(|| a.id.cmp(&b.id))
    });
    let mut expenses: Vec<Expense> = db.find_many(&[])?;
    expenses.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    Ok(ExportPayload { budgets, expenses })
}

pub(crate) fn write_export(path: &Path, payload: &ExportPayload) -> Result<()> {
    let text = serde_json::to_string_pretty(payload)?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write export: {}", path.display()))?;
    info!(
        path = %path.display(),
        budgets = payload.budgets.len(),
        expenses = payload.expenses.len(),
        "exported"
    );
    Ok(())
}

pub(crate) fn read_export(path: &Path) -> Result<ExportPayload> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read export: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Malformed export file: {}", path.display()))
}

/// Store the payload as-is, optionally wiping both collections first.
/// Records are trusted and not re-validated. Returns (budgets, expenses).
pub(crate) fn import(db: &Database, payload: &ExportPayload, replace: bool) -> Result<(usize, usize)> {
    db.load_all(&payload.budgets, &payload.expenses, replace)
        .context("Import failed")?;
    let (budgets, expenses) = (payload.budgets.len(), payload.expenses.len());
    info!(budgets, expenses, replace, "imported");
    Ok((budgets, expenses))
}

/// Wipe the local store and, when sync is configured, the remote one, then
/// reopen an empty store.
///
/// A remote failure is logged and reported after the local wipe is done.
pub(crate) fn delete_everything(session: &mut Session) -> Result<()> {
    let db = session.db()?;
    for collection in Collection::all() {
        db.drop_collection(*collection)?;
    }

    let token = session.settings().get(SYNC_TOKEN);
    let path = session.path().to_path_buf();
    session.close();
    erase_file(&path)?;

    let remote = if token.trim().is_empty() {
        Ok(())
    } else {
        erase_remote(&token)
    };

    if session.reconnect() != ConnectionState::Connected {
        bail!("Failed to reopen the store after deleting everything");
    }
    if let Err(err) = remote {
        warn!("Failed to erase remote data: {err:#}");
        bail!("Local data was deleted but the remote copy could not be erased");
    }
    info!(path = %path.display(), "deleted everything");
    Ok(())
}

fn erase_remote(token: &str) -> Result<()> {
    let target = RemoteTarget::parse(token)?;
    target.connect()?.erase()
}
