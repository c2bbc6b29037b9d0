#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn test_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let settings = FileSettings::load(&dir.path().join("settings.json")).unwrap();
    assert_eq!(settings.get(CURRENCY), "");
    assert_eq!(settings.get("anything"), "");
}

#[test]
fn test_set_persists_across_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");
    {
        let settings = FileSettings::load(&path).unwrap();
        settings.set(CURRENCY, "EUR").unwrap();
        settings.set(SYNC_TOKEN, "file:///tmp/remote.db").unwrap();
    }
    let settings = FileSettings::load(&path).unwrap();
    assert_eq!(settings.get(CURRENCY), "EUR");
    assert_eq!(settings.get(SYNC_TOKEN), "file:///tmp/remote.db");
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn test_setting_empty_value_clears() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let settings = FileSettings::load(&path).unwrap();
    settings.set(SYNC_TOKEN, "https://example.com/db").unwrap();
    settings.set(SYNC_TOKEN, "").unwrap();
    assert_eq!(settings.get(SYNC_TOKEN), "");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains(SYNC_TOKEN));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(FileSettings::load(&path).is_err());
}

#[test]
fn test_memory_settings() {
    let settings = MemorySettings::default();
    assert_eq!(settings.get(LAST_SYNC_DATE), "");
    settings.set(LAST_SYNC_DATE, "2024-05-01T00:00:00Z").unwrap();
    assert_eq!(settings.get(LAST_SYNC_DATE), "2024-05-01T00:00:00Z");
    assert_eq!(known().len(), 3);
}
