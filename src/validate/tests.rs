#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal_macros::dec;

fn day(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

// ── Amounts ───────────────────────────────────────────────────

#[test]
fn test_parse_amount() {
    assert_eq!(parse_amount("12.50"), Some(dec!(12.50)));
    assert_eq!(parse_amount(" 1,234.56 "), Some(dec!(1234.56)));
    assert_eq!(parse_amount("$0.01"), Some(dec!(0.01)));
    assert_eq!(parse_amount("-4"), Some(dec!(-4)));
    assert_eq!(parse_amount("NaN"), None);
    assert_eq!(parse_amount("abc"), None);
    assert_eq!(parse_amount(""), None);
}

#[test]
fn test_budget_value_rules() {
    assert_eq!(check_budget_value(Some(dec!(0.01))), Ok(dec!(0.01)));
    assert_eq!(check_budget_value(Some(dec!(0))), Err(FinanceError::InvalidValue));
    assert_eq!(check_budget_value(Some(dec!(-3))), Err(FinanceError::InvalidValue));
    assert_eq!(check_budget_value(None), Err(FinanceError::InvalidValue));
}

#[test]
fn test_cost_rules() {
    assert_eq!(check_cost(Some(dec!(0.01))), Ok(dec!(0.01)));
    assert_eq!(check_cost(Some(dec!(0))), Err(FinanceError::InvalidCost));
    assert_eq!(check_cost(Some(dec!(-0.01))), Err(FinanceError::InvalidCost));
    assert_eq!(check_cost(None), Err(FinanceError::InvalidCost));
}

// ── Names ─────────────────────────────────────────────────────

#[test]
fn test_budget_name_rules() {
    assert_eq!(check_budget_name("Total"), Err(FinanceError::ReservedName));
    assert_eq!(check_budget_name("   "), Err(FinanceError::EmptyName));
    assert_eq!(check_budget_name(""), Err(FinanceError::EmptyName));
    assert!(check_budget_name("total").is_ok());
    assert!(check_budget_name("Totals").is_ok());
    assert!(check_budget_name("Food").is_ok());
}

#[test]
fn test_description_rules() {
    assert_eq!(check_description(" \t"), Err(FinanceError::EmptyDescription));
    assert!(check_description("Coffee").is_ok());
}

// ── Months and dates ──────────────────────────────────────────

#[test]
fn test_normalize_month() {
    let today = day("2024-05-17");
    assert_eq!(normalize_month("2023-12", today), "2023-12");
    assert_eq!(normalize_month("2023-13", today), "2024-05");
    assert_eq!(normalize_month("2023-1", today), "2024-05");
    assert_eq!(normalize_month("May 2023", today), "2024-05");
    assert_eq!(normalize_month("", today), "2024-05");
}

#[test]
fn test_normalize_date() {
    let today = day("2024-05-17");
    assert_eq!(normalize_date("2024-02-29", today), "2024-02-29");
    assert_eq!(normalize_date("2023-02-29", today), "2024-05-17");
    assert_eq!(normalize_date("2024-5-1", today), "2024-05-17");
    assert_eq!(normalize_date("2024-05-01T10:00", today), "2024-05-17");
    assert_eq!(normalize_date("", today), "2024-05-17");
}

#[test]
fn test_month_helpers() {
    assert_eq!(month_of("2024-05-17"), "2024-05");
    assert_eq!(month_of("2024"), "2024");
    assert_eq!(
        month_bounds("2024-02"),
        ("2024-02-01".to_string(), "2024-02-31".to_string())
    );
}

#[test]
fn test_shift_month() {
    assert_eq!(shift_month("2024-01", -1).as_deref(), Some("2023-12"));
    assert_eq!(shift_month("2024-12", 1).as_deref(), Some("2025-01"));
    assert_eq!(shift_month("2024-05", 0).as_deref(), Some("2024-05"));
    assert_eq!(shift_month("2024-05", 14).as_deref(), Some("2025-07"));
    assert_eq!(shift_month("bogus", 1), None);
}

// ── Ids ───────────────────────────────────────────────────────

#[test]
fn test_generate_id_shape_and_uniqueness() {
    let a = generate_id();
    let b = generate_id();
    assert_ne!(a, b);
    let (millis, fraction) = a.split_once('-').unwrap();
    assert!(millis.parse::<i64>().unwrap() > 0);
    let fraction: f64 = fraction.parse().unwrap();
    assert!((0.0..1.0).contains(&fraction));
}
