#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::format::*;

// ── truncate ──────────────────────────────────────────────────

#[test]
fn test_truncate_short_string() {
    assert_eq!(truncate("coffee", 10), "coffee");
}

#[test]
fn test_truncate_long_string() {
    assert_eq!(truncate("weekly groceries", 8), "weekly …");
}

#[test]
fn test_truncate_zero_max() {
    assert_eq!(truncate("coffee", 0), "");
}

#[test]
fn test_truncate_unicode() {
    assert_eq!(truncate("café crème", 5), "café…");
}

// ── format_amount ─────────────────────────────────────────────

#[test]
fn test_format_amount_default_currency() {
    assert_eq!(format_amount(dec!(1234.56), ""), "$1,234.56");
}

#[test]
fn test_format_amount_rounds_to_cents() {
    assert_eq!(format_amount(dec!(1.5), "USD"), "$1.50");
    assert_eq!(format_amount(dec!(0), "USD"), "$0.00");
}

#[test]
fn test_format_amount_negative() {
    assert_eq!(format_amount(dec!(-42.50), "usd"), "-$42.50");
}

#[test]
fn test_format_amount_known_symbols() {
    assert_eq!(format_amount(dec!(1000000), "EUR"), "€1,000,000.00");
    assert_eq!(format_amount(dec!(3.2), "gbp"), "£3.20");
}

#[test]
fn test_format_amount_unknown_code() {
    assert_eq!(format_amount(dec!(99999.01), "CHF"), "CHF 99,999.01");
    assert_eq!(format_amount(dec!(-5), "CHF"), "-CHF 5.00");
}
