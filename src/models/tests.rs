#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::*;

// ── Budget ────────────────────────────────────────────────────

#[test]
fn test_budget_new() {
    let budget = Budget::new("Food".into(), "2024-01".into(), dec!(500));
    assert!(budget.is_new());
    assert_eq!(budget.id, NEW_ID);
    assert_eq!(budget.name, "Food");
    assert_eq!(budget.month, "2024-01");
    assert_eq!(budget.value, dec!(500));
}

#[test]
fn test_budget_covers_same_month_and_name() {
    let budget = Budget::new("Food".into(), "2024-05".into(), dec!(200));
    assert!(budget.covers("2024-05-01", "Food"));
    assert!(budget.covers("2024-05-31", "Food"));
    assert!(!budget.covers("2024-06-01", "Food"));
    assert!(!budget.covers("2024-05-10", "food"));
    assert!(!budget.covers("2024", "Food"));
}

#[test]
fn test_budget_json_field_names() {
    let mut budget = Budget::new("Rent".into(), "2024-02".into(), dec!(1200.50));
    budget.id = "abc".into();
    let json = serde_json::to_value(&budget).unwrap();
    assert_eq!(json["id"], "abc");
    assert_eq!(json["name"], "Rent");
    assert_eq!(json["month"], "2024-02");
    assert_eq!(json["value"], "1200.50");
    assert!(json.get("rev").is_none());
}

// ── Expense ───────────────────────────────────────────────────

#[test]
fn test_expense_new() {
    let expense = Expense::new("Coffee".into(), dec!(3.5), "2024-03-14".into(), String::new());
    assert!(expense.is_new());
    assert_eq!(expense.month(), "2024-03");
    assert!(expense.budget.is_empty());
}

#[test]
fn test_expense_month_of_short_date() {
    let expense = Expense::new("Odd".into(), dec!(1), "2024".into(), MISC.into());
    assert_eq!(expense.month(), "2024");
}

#[test]
fn test_expense_json_roundtrip_keeps_cents() {
    let mut expense = Expense::new("Lunch".into(), dec!(12.30), "2024-03-14".into(), "Food".into());
    expense.id = "1-0.5".into();
    let text = serde_json::to_string(&expense).unwrap();
    assert!(text.contains("\"cost\":\"12.30\""));
    let back: Expense = serde_json::from_str(&text).unwrap();
    assert_eq!(back, expense);
}

// ── Constants ─────────────────────────────────────────────────

#[test]
fn test_default_budget_value() {
    assert_eq!(DEFAULT_BUDGET_VALUE, dec!(100));
    assert_ne!(TOTAL, MISC);
}
