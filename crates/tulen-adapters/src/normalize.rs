// ABOUTME: Normalization helpers turning platform-native values into envelope units
// ABOUTME: Lenient number parsing, micro-currency conversion and snake-case breakdown keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde_json::Value;

/// Google Ads reports money in millionths of the account currency
pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Parse a number from loosely formatted text
///
/// Strips currency symbols, thousands separators, percent signs and
/// surrounding whitespace. Empty or unparseable input yields `None`.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '%' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric value from a JSON number or numeric string, `0.0` otherwise
///
/// Platforms disagree on whether counters are numbers (`5`) or strings
/// (`"5"`); Google Ads sends int64 fields as strings.
#[must_use]
pub fn value_as_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_number(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Non-negative whole count from a JSON value
#[must_use]
pub fn value_as_count(value: Option<&Value>) -> u64 {
    to_count(value_as_f64(value))
}

/// Round a float to a non-negative whole count
#[must_use]
pub fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Convert micro-currency units to currency units
#[must_use]
pub fn micros_to_currency(micros: f64) -> f64 {
    micros / MICROS_PER_UNIT
}

/// Normalize a breakdown dimension value to a snake-case key
///
/// `"Facebook Ads"` becomes `facebook_ads`, `"SEARCH"` becomes `search`;
/// ranges such as `25-34` keep their dash. Empty input becomes `unknown`.
#[must_use]
pub fn snake_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() || c == '-' || c == '+' {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if key.is_empty() {
        "unknown".to_owned()
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_formatted_numbers() {
        assert_eq!(parse_number("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("12%"), Some(12.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn reads_numbers_and_numeric_strings() {
        let row = json!({"a": 5, "b": "17", "c": null, "d": "x"});
        assert!((value_as_f64(row.get("a")) - 5.0).abs() < f64::EPSILON);
        assert_eq!(value_as_count(row.get("b")), 17);
        assert_eq!(value_as_count(row.get("c")), 0);
        assert_eq!(value_as_count(row.get("d")), 0);
        assert_eq!(value_as_count(row.get("missing")), 0);
    }

    #[test]
    fn converts_micros() {
        assert!((micros_to_currency(12_500_000.0) - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn snake_cases_dimension_values() {
        assert_eq!(snake_key("Facebook Ads"), "facebook_ads");
        assert_eq!(snake_key("SEARCH"), "search");
        assert_eq!(snake_key("PERFORMANCE_MAX"), "performance_max");
        assert_eq!(snake_key("25-34"), "25-34");
        assert_eq!(snake_key("65+"), "65+");
        assert_eq!(snake_key("  "), "unknown");
    }
}
