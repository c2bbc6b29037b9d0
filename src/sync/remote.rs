use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::db::{ChangeBatch, Collection, Database, Revision};
use crate::error::FinanceError;

/// The far side of replication.
pub(crate) trait Remote: Send {
    /// Revisions the remote recorded after `since`.
    fn changes(&mut self, collection: Collection, since: i64) -> Result<ChangeBatch>;
    /// Offer revisions to the remote; it keeps the ones that win.
    fn apply(&mut self, collection: Collection, revisions: &[Revision]) -> Result<usize>;
    /// Remove every document of every collection.
    fn erase(&mut self) -> Result<()>;
}

/// Where a sync token points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RemoteTarget {
    Http(Url),
    File(PathBuf),
}

impl RemoteTarget {
    pub(crate) fn parse(token: &str) -> Result<Self, FinanceError> {
        let token = token.trim();
        if let Some(path) = token.strip_prefix("file://") {
            if path.is_empty() {
                return Err(FinanceError::InvalidSyncToken(token.to_string()));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if token.starts_with("http://") || token.starts_with("https://") {
            let mut url = Url::parse(token)
                .map_err(|err| FinanceError::InvalidSyncToken(format!("{token}: {err}")))?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(Self::Http(url));
        }
        Err(FinanceError::InvalidSyncToken(token.to_string()))
    }

    pub(crate) fn connect(&self) -> Result<Box<dyn Remote>> {
        match self {
            Self::Http(url) => Ok(Box::new(HttpRemote::new(url.clone())?)),
            Self::File(path) => Ok(Box::new(SqliteRemote::open(path)?)),
        }
    }
}

/// A store file reachable through the filesystem, e.g. a shared folder.
pub(crate) struct SqliteRemote {
    db: Database,
}

impl SqliteRemote {
    pub(crate) fn open(path: &std::path::Path) -> Result<Self> {
        let db = Database::open(path)
            .with_context(|| format!("Failed to open remote store: {}", path.display()))?;
        Ok(Self { db })
    }
}

impl Remote for SqliteRemote {
    fn changes(&mut self, collection: Collection, since: i64) -> Result<ChangeBatch> {
        self.db.changes_since(collection, since)
    }

    fn apply(&mut self, collection: Collection, revisions: &[Revision]) -> Result<usize> {
        self.db.apply_revisions(collection, revisions)
    }

    fn erase(&mut self) -> Result<()> {
        for collection in Collection::all() {
            self.db.drop_collection(*collection)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ApplyRequest<'a> {
    docs: &'a [Revision],
}

#[derive(Debug, Deserialize)]
struct ApplyResponse {
    applied: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// A replication endpoint speaking JSON over HTTP:
///
/// - `GET {base}/{collection}/_changes?since=N` returns a change batch
/// - `POST {base}/{collection}/_revs` takes `{"docs": [...]}`
/// - `DELETE {base}/{collection}` erases the collection
pub(crate) struct HttpRemote {
    base: Url,
    http: Client,
}

impl HttpRemote {
    pub(crate) fn new(base: Url) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base, http })
    }

    pub(crate) fn endpoint(&self, collection: Collection, suffix: &str) -> Result<Url> {
        let path = if suffix.is_empty() {
            collection.as_str().to_string()
        } else {
            format!("{collection}/{suffix}")
        };
        self.base
            .join(&path)
            .with_context(|| format!("Invalid remote path: {path}"))
    }
}

fn check(res: Response) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res
        .json::<ErrorResponse>()
        .map(|err| err.error)
        .unwrap_or_else(|_| "unknown error".to_string());
    bail!("Remote returned {status}: {body}")
}

impl Remote for HttpRemote {
    fn changes(&mut self, collection: Collection, since: i64) -> Result<ChangeBatch> {
        let endpoint = self.endpoint(collection, "_changes")?;
        let res = self
            .http
            .get(endpoint)
            .query(&[("since", since)])
            .send()
            .with_context(|| format!("Failed to fetch remote {collection} changes"))?;
        Ok(check(res)?.json::<ChangeBatch>()?)
    }

    fn apply(&mut self, collection: Collection, revisions: &[Revision]) -> Result<usize> {
        let endpoint = self.endpoint(collection, "_revs")?;
        let res = self
            .http
            .post(endpoint)
            .json(&ApplyRequest { docs: revisions })
            .send()
            .with_context(|| format!("Failed to push {collection} to remote"))?;
        Ok(check(res)?.json::<ApplyResponse>()?.applied)
    }

    fn erase(&mut self) -> Result<()> {
        for collection in Collection::all() {
            let endpoint = self.endpoint(*collection, "")?;
            let res = self
                .http
                .delete(endpoint)
                .send()
                .with_context(|| format!("Failed to erase remote {collection}"))?;
            if res.status() != reqwest::StatusCode::NOT_FOUND {
                check(res)?;
            }
        }
        Ok(())
    }
}
