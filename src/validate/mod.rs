//! Field rules applied to every budget and expense before it reaches the
//! store.
//!
//! Rejections come back as [`FinanceError`] values; malformed months and
//! dates are not rejected but replaced with the current month or day.

use chrono::{Local, Months, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::FinanceError;
use crate::models::TOTAL;

fn month_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}$").ok())
        .as_ref()
}

fn date_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").ok())
        .as_ref()
}

/// Parse a user-entered amount. `None` is the "not a number" case.
pub(crate) fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    Decimal::from_str(&cleaned).ok()
}

pub(crate) fn check_budget_name(name: &str) -> Result<(), FinanceError> {
    if name == TOTAL {
        return Err(FinanceError::ReservedName);
    }
    if name.trim().is_empty() {
        return Err(FinanceError::EmptyName);
    }
    Ok(())
}

pub(crate) fn check_budget_value(value: Option<Decimal>) -> Result<Decimal, FinanceError> {
    match value {
        Some(v) if v > Decimal::ZERO => Ok(v),
        _ => Err(FinanceError::InvalidValue),
    }
}

pub(crate) fn check_description(description: &str) -> Result<(), FinanceError> {
    if description.trim().is_empty() {
        return Err(FinanceError::EmptyDescription);
    }
    Ok(())
}

pub(crate) fn check_cost(cost: Option<Decimal>) -> Result<Decimal, FinanceError> {
    match cost {
        Some(c) if c > Decimal::ZERO => Ok(c),
        _ => Err(FinanceError::InvalidCost),
    }
}

pub(crate) fn is_valid_month(month: &str) -> bool {
    month_pattern().is_some_and(|re| re.is_match(month))
        && NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok()
}

pub(crate) fn is_valid_date(date: &str) -> bool {
    date_pattern().is_some_and(|re| re.is_match(date))
        && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// `month` if it is a real "YYYY-MM" month, otherwise the month of `today`.
pub(crate) fn normalize_month(month: &str, today: NaiveDate) -> String {
    if is_valid_month(month) {
        month.to_string()
    } else {
        today.format("%Y-%m").to_string()
    }
}

/// `date` if it is a real "YYYY-MM-DD" day, otherwise `today`.
pub(crate) fn normalize_date(date: &str, today: NaiveDate) -> String {
    if is_valid_date(date) {
        date.to_string()
    } else {
        today.format("%Y-%m-%d").to_string()
    }
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn current_month() -> String {
    today().format("%Y-%m").to_string()
}

/// The "YYYY-MM" prefix of a date.
pub(crate) fn month_of(date: &str) -> &str {
    date.get(..7).unwrap_or(date)
}

/// Inclusive date-string range covering every day of `month`.
pub(crate) fn month_bounds(month: &str) -> (String, String) {
    (format!("{month}-01"), format!("{month}-31"))
}

/// The month `delta` months away from `month`, or `None` if `month` is not
/// a valid month.
pub(crate) fn shift_month(month: &str, delta: i32) -> Option<String> {
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").ok()?;
    let shifted = if delta >= 0 {
        first.checked_add_months(Months::new(delta.unsigned_abs()))?
    } else {
        first.checked_sub_months(Months::new(delta.unsigned_abs()))?
    };
    Some(shifted.format("%Y-%m").to_string())
}

/// A collision-resistant id made of the current time in milliseconds and a
/// random fraction.
pub(crate) fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let fraction: f64 = rand::random();
    format!("{millis}-{fraction}")
}

#[cfg(test)]
mod tests;
