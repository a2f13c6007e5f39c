//! Derived order values: processing time, gross margin, priority words.
//!
//! Each value has a typed form returning `Result` and a text form used by
//! the stage, which renders failures as an empty field.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use crate::models::OrderPriority;

/// Month/day/year, with or without zero padding.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Gross margin written when revenue is exactly zero.
pub const ZERO_REVENUE_MARGIN: &str = "0.0";

/// Why a derived value could not be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeriveError {
    #[error("invalid date '{0}', expected month/day/year")]
    InvalidDate(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

pub fn parse_date(value: &str) -> Result<NaiveDate, DeriveError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| DeriveError::InvalidDate(value.to_string()))
}

fn parse_number(value: &str) -> Result<f64, DeriveError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| DeriveError::InvalidNumber(value.to_string()))
}

// =============================================================================
// Order Processing Time
// =============================================================================

/// Whole days from order date to ship date. Negative when shipped "before" ordering.
pub fn processing_days(order_date: &str, ship_date: &str) -> Result<i64, DeriveError> {
    let order = parse_date(order_date)?;
    let ship = parse_date(ship_date)?;
    Ok((ship - order).num_days())
}

/// Text form of [`processing_days`]; empty on parse failure.
pub fn processing_time(order_date: &str, ship_date: &str) -> String {
    processing_days(order_date, ship_date)
        .map(|days| days.to_string())
        .unwrap_or_default()
}

// =============================================================================
// Gross Margin
// =============================================================================

/// Profit as a share of revenue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrossMargin {
    /// Revenue was exactly zero, no ratio exists.
    ZeroRevenue,
    /// profit / revenue × 100.
    Percent(f64),
}

impl fmt::Display for GrossMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroRevenue => f.write_str(ZERO_REVENUE_MARGIN),
            Self::Percent(value) => f.write_str(&round_half_up(*value, MARGIN_PLACES)),
        }
    }
}

const MARGIN_PLACES: usize = 2;

/// Fixed-point text of `value`, rounded half-up on its shortest decimal form.
///
/// `{:.2}` rounds the exact binary value with ties to even instead, so
/// `1.005` (stored as 1.00499...) would come out as `1.00` and `0.125` as `0.12`.
fn round_half_up(value: f64, places: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    // f64 Display is the shortest round-trip form and never uses an exponent.
    let shortest = value.abs().to_string();
    let (int_part, frac_part) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(places))
        .map(|b| b - b'0')
        .collect();

    let round_up = frac_part.as_bytes().get(places).is_some_and(|&b| b >= b'5');
    if round_up {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - places;
    let render = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let sign = if value.is_sign_negative() { "-" } else { "" };

    if places == 0 {
        format!("{}{}", sign, render(&digits))
    } else {
        format!("{}{}.{}", sign, render(&digits[..split]), render(&digits[split..]))
    }
}

pub fn gross_margin_value(total_profit: &str, total_revenue: &str) -> Result<GrossMargin, DeriveError> {
    let profit = parse_number(total_profit)?;
    let revenue = parse_number(total_revenue)?;

    if revenue == 0.0 {
        Ok(GrossMargin::ZeroRevenue)
    } else {
        Ok(GrossMargin::Percent(profit / revenue * 100.0))
    }
}

/// Text form of [`gross_margin_value`]; empty on parse failure.
pub fn gross_margin(total_profit: &str, total_revenue: &str) -> String {
    gross_margin_value(total_profit, total_revenue)
        .map(|margin| margin.to_string())
        .unwrap_or_default()
}

// =============================================================================
// Order Priority
// =============================================================================

/// Expand a priority code into its word; other values pass through.
pub fn normalize_priority(value: &str) -> String {
    OrderPriority::from_code(value)
        .map(|priority| priority.as_str().to_string())
        .unwrap_or_else(|| value.to_string())
}
