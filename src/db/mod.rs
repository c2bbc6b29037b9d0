mod document;
mod revision;
mod schema;

pub(crate) use document::{Collection, Document, Filter};
pub(crate) use revision::{ChangeBatch, Revision};

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::FinanceError;
use crate::models::{Budget, Expense};
use revision::{compare_revs, make_rev, parse_rev, tombstone_rev};

/// Handle to the local document store.
///
/// Clones share one connection; background sync workers hold clones while
/// foreground callers keep using the original.
#[derive(Clone)]
pub(crate) struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .context("Failed to set database pragmas")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate().context("Database migration failed")?;
        info!(path = %path.display(), "opened document store");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        let has_version_table: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        create_collections(&conn)?;

        if !has_version_table {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    /// Create any missing collection tables. Safe to call repeatedly.
    pub(crate) fn ensure_collections(&self) -> Result<()> {
        let conn = self.conn()?;
        create_collections(&conn)
    }

    // ── Reads ─────────────────────────────────────────────────

    pub(crate) fn get<T: Document>(&self, id: &str) -> Result<Option<T>> {
        self.find_one(&[Filter::eq("id", id)])
    }

    pub(crate) fn find_one<T: Document>(&self, filters: &[Filter]) -> Result<Option<T>> {
        let (clause, values) = where_clause::<T>(filters)?;
        let sql = format!(
            "SELECT {} FROM {}{clause} LIMIT 1",
            columns::<T>(),
            T::COLLECTION
        );
        let conn = self.conn()?;
        Ok(conn
            .query_row(&sql, params_from_iter(values.iter()), |row| {
                T::from_row(row, 0)
            })
            .optional()?)
    }

    /// All live documents matching every filter. No ordering is promised.
    pub(crate) fn find_many<T: Document>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        let (clause, values) = where_clause::<T>(filters)?;
        let sql = format!("SELECT {} FROM {}{clause}", columns::<T>(), T::COLLECTION);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| T::from_row(row, 0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn count<T: Document>(&self, filters: &[Filter]) -> Result<usize> {
        let (clause, values) = where_clause::<T>(filters)?;
        let sql = format!("SELECT COUNT(*) FROM {}{clause}", T::COLLECTION);
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // ── Writes ────────────────────────────────────────────────

    /// Insert a document under its own id, returning the new revision.
    pub(crate) fn insert<T: Document>(&self, doc: &T) -> Result<String> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let rev = put_new(&tx, doc)?;
        tx.commit()?;
        debug!(collection = %T::COLLECTION, id = doc.id(), %rev, "inserted");
        Ok(rev)
    }

    pub(crate) fn bulk_insert<T: Document>(&self, docs: &[T]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for doc in docs {
            put_new(&tx, doc)?;
        }
        tx.commit()?;
        debug!(collection = %T::COLLECTION, count = docs.len(), "bulk inserted");
        Ok(docs.len())
    }

    /// Overwrite some fields of a live document and return it as stored.
    ///
    /// The write is conditioned on the revision read at the start, so a
    /// concurrent writer that got in between turns this into an error rather
    /// than a silent merge.
    pub(crate) fn update<T: Document>(&self, id: &str, changes: &[(&'static str, Value)]) -> Result<T> {
        for (field, _) in changes {
            if *field == "id" || !T::has_field(field) {
                bail!("Cannot update field '{field}' of a {}", T::COLLECTION.kind());
            }
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let table = T::COLLECTION.as_str();

        let current: Option<String> = tx
            .query_row(
                &format!("SELECT rev FROM {table} WHERE id = ?1 AND deleted = 0"),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(FinanceError::NotFound {
                kind: T::COLLECTION.kind(),
                id: id.to_string(),
            }
            .into());
        };

        let seq = next_seq(&tx, T::COLLECTION)?;
        let mut assignments = vec!["seq = ?3".to_string()];
        let mut values = vec![
            Value::Text(id.to_string()),
            Value::Text(current.clone()),
            Value::Integer(seq),
        ];
        for (field, value) in changes {
            values.push(value.clone());
            assignments.push(format!("{field} = ?{}", values.len()));
        }
        let sql = format!(
            "UPDATE {table} SET {} WHERE id = ?1 AND rev = ?2",
            assignments.join(", ")
        );
        if tx.execute(&sql, params_from_iter(values.iter()))? == 0 {
            bail!("Stale revision {current} for {} {id}", T::COLLECTION.kind());
        }

        let doc: T = tx.query_row(
            &format!("SELECT {} FROM {table} WHERE id = ?1", columns::<T>()),
            params![id],
            |row| T::from_row(row, 0),
        )?;
        let rev = make_rev(parse_rev(&current).0 + 1, &serde_json::to_value(&doc)?);
        tx.execute(
            &format!("UPDATE {table} SET rev = ?1 WHERE id = ?2"),
            params![rev, id],
        )?;
        tx.commit()?;
        debug!(collection = %T::COLLECTION, id, %rev, "updated");
        Ok(doc)
    }

    /// Delete a live document. A tombstone stays behind so the removal can
    /// replicate.
    pub(crate) fn remove<T: Document>(&self, id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let table = T::COLLECTION.as_str();

        let current: Option<String> = tx
            .query_row(
                &format!("SELECT rev FROM {table} WHERE id = ?1 AND deleted = 0"),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(FinanceError::NotFound {
                kind: T::COLLECTION.kind(),
                id: id.to_string(),
            }
            .into());
        };

        let seq = next_seq(&tx, T::COLLECTION)?;
        let rev = tombstone_rev(&current, id);
        tx.execute(
            &format!("UPDATE {table} SET deleted = 1, rev = ?1, seq = ?2 WHERE id = ?3"),
            params![rev, seq, id],
        )?;
        tx.commit()?;
        debug!(collection = %T::COLLECTION, id, %rev, "removed");
        Ok(())
    }

    /// Drop every row of a collection, tombstones included, and recreate
    /// the empty table. Sync checkpoints for the collection start over.
    pub(crate) fn drop_collection(&self, collection: Collection) -> Result<()> {
        let conn = self.conn()?;
        reset_collection(&conn, collection)?;
        info!(%collection, "dropped collection");
        Ok(())
    }

    /// Load budgets and expenses in one transaction, optionally emptying
    /// both collections first. Nothing changes unless every write succeeds.
    pub(crate) fn load_all(&self, budgets: &[Budget], expenses: &[Expense], replace: bool) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if replace {
            for collection in Collection::all() {
                reset_collection(&tx, *collection)?;
            }
        }
        for budget in budgets {
            put_new(&tx, budget).context("Failed to load budgets")?;
        }
        for expense in expenses {
            put_new(&tx, expense).context("Failed to load expenses")?;
        }
        tx.commit()?;
        debug!(budgets = budgets.len(), expenses = expenses.len(), replace, "loaded");
        Ok(())
    }

    // ── Replication ───────────────────────────────────────────

    /// Live documents and tombstones written after `since`, oldest first.
    pub(crate) fn changes_since(&self, collection: Collection, since: i64) -> Result<ChangeBatch> {
        match collection {
            Collection::Budgets => self.changes_of::<Budget>(since),
            Collection::Expenses => self.changes_of::<Expense>(since),
        }
    }

    fn changes_of<T: Document>(&self, since: i64) -> Result<ChangeBatch> {
        let sql = format!(
            "SELECT rev, seq, deleted, {} FROM {} WHERE seq > ?1 ORDER BY seq",
            columns::<T>(),
            T::COLLECTION
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![since], |row| {
            let rev: String = row.get(0)?;
            let seq: i64 = row.get(1)?;
            let deleted: bool = row.get(2)?;
            Ok((rev, seq, deleted, T::from_row(row, 3)?))
        })?;

        let mut batch = ChangeBatch {
            results: Vec::new(),
            last_seq: since,
        };
        for row in rows {
            let (rev, seq, deleted, doc) = row?;
            batch.last_seq = batch.last_seq.max(seq);
            let body = if deleted {
                None
            } else {
                Some(serde_json::to_value(&doc)?)
            };
            batch.results.push(Revision {
                id: doc.id().to_string(),
                rev,
                deleted,
                doc: body,
            });
        }
        Ok(batch)
    }

    /// Store incoming revisions that beat the local ones, keeping their
    /// revision markers. Returns how many were applied.
    pub(crate) fn apply_revisions(&self, collection: Collection, revisions: &[Revision]) -> Result<usize> {
        match collection {
            Collection::Budgets => self.apply_of::<Budget>(revisions),
            Collection::Expenses => self.apply_of::<Expense>(revisions),
        }
    }

    fn apply_of<T: Document>(&self, revisions: &[Revision]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let table = T::COLLECTION.as_str();
        let mut applied = 0;

        for incoming in revisions {
            let local: Option<String> = tx
                .query_row(
                    &format!("SELECT rev FROM {table} WHERE id = ?1"),
                    params![incoming.id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(local) = &local {
                if compare_revs(&incoming.rev, local) != Ordering::Greater {
                    continue;
                }
            }

            if incoming.deleted {
                let seq = next_seq(&tx, T::COLLECTION)?;
                tx.execute(
                    &format!(
                        "INSERT INTO {table} (id, rev, seq, deleted) VALUES (?1, ?2, ?3, 1)
                         ON CONFLICT(id) DO UPDATE SET rev = excluded.rev, seq = excluded.seq, deleted = 1"
                    ),
                    params![incoming.id, incoming.rev, seq],
                )?;
            } else {
                let body = incoming.doc.clone().with_context(|| {
                    format!("Revision {} of {} has no body", incoming.rev, incoming.id)
                })?;
                let doc: T = serde_json::from_value(body).with_context(|| {
                    format!("Malformed {} {}", T::COLLECTION.kind(), incoming.id)
                })?;
                if doc.id() != incoming.id {
                    bail!("Revision for {} carries document {}", incoming.id, doc.id());
                }
                write_row(&tx, &doc, &incoming.rev)?;
            }
            applied += 1;
        }

        tx.commit()?;
        if applied > 0 {
            debug!(collection = %T::COLLECTION, applied, "applied replicated revisions");
        }
        Ok(applied)
    }

    /// (pulled_seq, pushed_seq) for a collection against one remote.
    pub(crate) fn checkpoint(&self, collection: Collection, remote: &str) -> Result<(i64, i64)> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT pulled_seq, pushed_seq FROM sync_checkpoints
                 WHERE collection = ?1 AND remote = ?2",
                params![collection.as_str(), remote],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(found.unwrap_or((0, 0)))
    }

    pub(crate) fn save_checkpoint(
        &self,
        collection: Collection,
        remote: &str,
        pulled: i64,
        pushed: i64,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_checkpoints (collection, remote, pulled_seq, pushed_seq)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, remote)
             DO UPDATE SET pulled_seq = excluded.pulled_seq, pushed_seq = excluded.pushed_seq",
            params![collection.as_str(), remote, pulled, pushed],
        )?;
        Ok(())
    }
}

/// Remove a database file together with its WAL and shared-memory siblings.
/// Missing files are not an error.
pub(crate) fn erase_file(path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut target = path.as_os_str().to_owned();
        target.push(suffix);
        match std::fs::remove_file(&target) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to erase {}", Path::new(&target).display())
                })
            }
        }
    }
    info!(path = %path.display(), "erased store files");
    Ok(())
}

fn create_collections(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::SCHEMA_VERSION_TABLE)?;
    conn.execute_batch(schema::SEQUENCES_TABLE)?;
    conn.execute_batch(schema::CHECKPOINTS_TABLE)?;
    for collection in Collection::all() {
        conn.execute_batch(schema::table_schema(*collection))?;
    }
    Ok(())
}

fn columns<T: Document>() -> String {
    format!("id, {}", T::FIELDS.join(", "))
}

fn where_clause<T: Document>(filters: &[Filter]) -> Result<(String, Vec<Value>)> {
    let mut sql = String::from(" WHERE deleted = 0");
    let mut values: Vec<Value> = Vec::new();

    for filter in filters {
        let field = filter.field();
        if !T::has_field(field) {
            bail!("Unknown field '{field}' for {}", T::COLLECTION);
        }
        match filter {
            Filter::Eq(_, value) => {
                values.push(Value::Text(value.clone()));
                sql.push_str(&format!(" AND {field} = ?{}", values.len()));
            }
            Filter::Between(_, low, high) => {
                values.push(Value::Text(low.clone()));
                values.push(Value::Text(high.clone()));
                sql.push_str(&format!(
                    " AND {field} BETWEEN ?{} AND ?{}",
                    values.len() - 1,
                    values.len()
                ));
            }
            Filter::NotId(id) => {
                values.push(Value::Text(id.clone()));
                sql.push_str(&format!(" AND id != ?{}", values.len()));
            }
        }
    }

    Ok((sql, values))
}

fn reset_collection(conn: &Connection, collection: Collection) -> Result<()> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {collection};"))
        .with_context(|| format!("Failed to drop {collection}"))?;
    conn.execute(
        "DELETE FROM sync_checkpoints WHERE collection = ?1",
        params![collection.as_str()],
    )?;
    conn.execute_batch(schema::table_schema(collection))?;
    Ok(())
}

fn next_seq(conn: &Connection, collection: Collection) -> Result<i64> {
    Ok(conn.query_row(
        "UPDATE sequences SET seq = seq + 1 WHERE collection = ?1 RETURNING seq",
        params![collection.as_str()],
        |row| row.get(0),
    )?)
}

/// First write of an id, or a resurrection of a tombstoned one.
fn put_new<T: Document>(conn: &Connection, doc: &T) -> Result<String> {
    let existing: Option<(String, bool)> = conn
        .query_row(
            &format!("SELECT rev, deleted FROM {} WHERE id = ?1", T::COLLECTION),
            params![doc.id()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let generation = match existing {
        Some((_, false)) => bail!("A {} with id {} already exists", T::COLLECTION.kind(), doc.id()),
        Some((rev, true)) => parse_rev(&rev).0 + 1,
        None => 1,
    };
    let rev = make_rev(generation, &serde_json::to_value(doc)?);
    write_row(conn, doc, &rev)?;
    Ok(rev)
}

fn write_row<T: Document>(conn: &Connection, doc: &T, rev: &str) -> Result<()> {
    let seq = next_seq(conn, T::COLLECTION)?;
    let placeholders: Vec<String> = (0..T::FIELDS.len()).map(|i| format!("?{}", i + 4)).collect();
    let sql = format!(
        "INSERT OR REPLACE INTO {} (id, rev, seq, deleted, {}) VALUES (?1, ?2, ?3, 0, {})",
        T::COLLECTION,
        T::FIELDS.join(", "),
        placeholders.join(", ")
    );
    let mut values = vec![
        Value::Text(doc.id().to_string()),
        Value::Text(rev.to_string()),
        Value::Integer(seq),
    ];
    values.extend(doc.values());
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(())
}
