#![allow(clippy::unwrap_used)]

use super::*;
use crate::settings::{MemorySettings, SYNC_TOKEN};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn argv(args: &[&str]) -> Vec<String> {
    let mut full = vec!["budgetsync".to_string()];
    full.extend(strings(args));
    full
}

fn session_in(dir: &tempfile::TempDir) -> Session {
    Session::connect(&dir.path().join("local.db"), Arc::new(MemorySettings::default()))
}

// ── Argument helpers ──────────────────────────────────────────

#[test]
fn test_positionals_skip_flags_and_values() {
    let args = strings(&["Coffee", "--date", "2024-05-01", "3.50", "--replace"]);
    assert_eq!(positionals(&args), ["Coffee", "3.50"]);
    assert_eq!(flag(&args, "--date"), Some("2024-05-01"));
    assert_eq!(flag(&args, "--budget"), None);
    assert!(has_switch(&args, "--replace"));
}

#[test]
fn test_month_arg() {
    assert_eq!(month_arg(&strings(&["2024-02"])).unwrap(), "2024-02");
    assert_eq!(month_arg(&[]).unwrap(), current_month());
    assert!(month_arg(&strings(&["February"])).is_err());
}

#[test]
fn test_shellexpand_home() {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    assert_eq!(shellexpand("~/backup.json"), format!("{home}/backup.json"));
    assert_eq!(shellexpand("/tmp/backup.json"), "/tmp/backup.json");
}

// ── Month seeding ─────────────────────────────────────────────

#[test]
fn test_seed_month_copies_previous_month() {
    let db = Database::open_in_memory().unwrap();
    save_budget(&db, &Budget::new("Food".into(), "2024-04".into(), dec!(300))).unwrap();
    save_budget(&db, &Budget::new("Rent".into(), "2024-04".into(), dec!(900))).unwrap();

    assert_eq!(seed_month(&db, "2024-05", "2024-05").unwrap(), 2);
    let names: Vec<_> = budgets_for_month(&db, "2024-05")
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, ["Food", "Rent"]);
    assert_eq!(seed_month(&db, "2024-05", "2024-05").unwrap(), 0);
}

#[test]
fn test_seed_month_leaves_past_months_alone() {
    let db = Database::open_in_memory().unwrap();
    save_budget(&db, &Budget::new("Food".into(), "2024-01".into(), dec!(300))).unwrap();
    assert_eq!(seed_month(&db, "2024-02", "2024-05").unwrap(), 0);
    assert!(budgets_for_month(&db, "2024-02").unwrap().is_empty());
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn test_budget_and_spend_commands() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir);

    as_cli(&argv(&["budget-set", "Food", "300", "--month", "2024-05"]), &mut session).unwrap();
    as_cli(
        &argv(&["spend", "Groceries", "$42.10", "--date", "2024-05-03", "--budget", "Food"]),
        &mut session,
    )
    .unwrap();
    as_cli(&argv(&["summary", "2024-05"]), &mut session).unwrap();

    as_cli(&argv(&["expenses", "--from", "2024-05-01", "--to", "2024-05-03"]), &mut session).unwrap();
    assert!(as_cli(&argv(&["expenses", "--from", "2024-05-01"]), &mut session).is_err());

    let expenses = expenses_for_month(session.db().unwrap(), "2024-05").unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].cost, dec!(42.10));
    assert_eq!(expenses[0].budget, "Food");
}

#[test]
fn test_copy_refuses_month_with_budgets() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir);
    as_cli(&argv(&["budget-set", "Food", "300", "--month", "2024-05"]), &mut session).unwrap();

    as_cli(&argv(&["copy", "2024-05", "2024-06"]), &mut session).unwrap();
    assert!(as_cli(&argv(&["copy", "2024-05", "2024-06"]), &mut session).is_err());

    let june = budgets_for_month(session.db().unwrap(), "2024-06").unwrap();
    assert_eq!(june.len(), 1);
    assert_eq!(june[0].name, "Food");
}

#[test]
fn test_unparsable_amounts_are_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir);

    let err = as_cli(&argv(&["budget-set", "Food", "lots"]), &mut session).unwrap_err();
    assert_eq!(err.downcast_ref::<FinanceError>(), Some(&FinanceError::InvalidValue));
    let err = as_cli(&argv(&["spend", "Coffee", "NaN"]), &mut session).unwrap_err();
    assert_eq!(err.downcast_ref::<FinanceError>(), Some(&FinanceError::InvalidCost));
}

#[test]
fn test_export_import_commands() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("backup.json");
    let file = file.to_str().unwrap();
    let mut session = session_in(&dir);

    as_cli(&argv(&["budget-set", "Food", "300", "--month", "2024-05"]), &mut session).unwrap();
    as_cli(&argv(&["export", file]), &mut session).unwrap();
    as_cli(&argv(&["import", file, "--replace"]), &mut session).unwrap();

    assert_eq!(budgets_for_month(session.db().unwrap(), "2024-05").unwrap().len(), 1);
}

#[test]
fn test_wipe_needs_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir);
    as_cli(&argv(&["budget-set", "Food", "300"]), &mut session).unwrap();

    assert!(as_cli(&argv(&["wipe"]), &mut session).is_err());
    assert_eq!(session.db().unwrap().count::<Budget>(&[]).unwrap(), 1);
    as_cli(&argv(&["wipe", "--yes"]), &mut session).unwrap();
    assert_eq!(session.db().unwrap().count::<Budget>(&[]).unwrap(), 0);
}

#[test]
fn test_config_command() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir);

    as_cli(&argv(&["config", "currency", "EUR"]), &mut session).unwrap();
    assert_eq!(session.settings().get(CURRENCY), "EUR");
    as_cli(&argv(&["config"]), &mut session).unwrap();
    assert!(as_cli(&argv(&["config", "colour", "blue"]), &mut session).is_err());
}

#[test]
fn test_sync_requires_token() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir);
    assert!(session.settings().get(SYNC_TOKEN).is_empty());
    assert!(as_cli(&argv(&["sync", "--seconds", "0"]), &mut session).is_err());
}

#[test]
fn test_unknown_command_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir);
    assert!(as_cli(&argv(&["frobnicate"]), &mut session).is_err());
    as_cli(&argv(&["help"]), &mut session).unwrap();
}
