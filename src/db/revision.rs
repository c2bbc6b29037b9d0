use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

/// One document state as it travels between replicas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Revision {
    pub id: String,
    pub rev: String,
    #[serde(default)]
    pub deleted: bool,
    /// Absent for tombstones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<serde_json::Value>,
}

/// Changes after a given sequence number, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChangeBatch {
    pub results: Vec<Revision>,
    pub last_seq: i64,
}

/// Build the revision marker for generation `generation` of `body`.
pub(crate) fn make_rev(generation: u64, body: &serde_json::Value) -> String {
    let digest = Sha256::digest(body.to_string().as_bytes());
    let hex = format!("{digest:x}");
    format!("{generation}-{}", &hex[..16])
}

pub(crate) fn tombstone_rev(previous: &str, id: &str) -> String {
    let (generation, _) = parse_rev(previous);
    make_rev(
        generation + 1,
        &serde_json::json!({ "id": id, "deleted": true }),
    )
}

/// Split a marker into (generation, hash). Unparsable markers sort first.
pub(crate) fn parse_rev(rev: &str) -> (u64, &str) {
    match rev.split_once('-') {
        Some((generation, hash)) => (generation.parse().unwrap_or(0), hash),
        None => (0, rev),
    }
}

/// Last-writer-wins: the higher generation wins, ties go to the greater hash
/// so every replica picks the same winner.
pub(crate) fn compare_revs(a: &str, b: &str) -> Ordering {
    parse_rev(a).cmp(&parse_rev(b))
}
