//! Request field checks shared by the handlers.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ApiError;

pub const MAX_TEXT_LEN: usize = 255;
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;
/// Upper bound for prices and areas.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// In `(0, MAX_AMOUNT]`.
pub fn positive(field: &str, value: Decimal) -> Result<Decimal, ApiError> {
    if value <= Decimal::ZERO {
        return Err(ApiError::Validation(format!("{field} must be greater than 0")));
    }
    if value > MAX_AMOUNT {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {MAX_AMOUNT}"
        )));
    }
    Ok(value)
}

pub fn positive_id(field: &str, value: i64) -> Result<i64, ApiError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ApiError::Validation(format!("{field} must be a positive integer")))
    }
}

pub fn count(field: &str, value: Option<i64>) -> Result<Option<u32>, ApiError> {
    value
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| ApiError::Validation(format!("{field} must be a non-negative integer")))
        })
        .transpose()
}

pub fn year(field: &str, value: Option<i32>) -> Result<Option<i32>, ApiError> {
    match value {
        Some(y) if !(MIN_YEAR..=MAX_YEAR).contains(&y) => Err(ApiError::Validation(format!(
            "{field} must be between {MIN_YEAR} and {MAX_YEAR}"
        ))),
        other => Ok(other),
    }
}

pub fn latitude(value: Option<f64>) -> Result<Option<f64>, ApiError> {
    in_range("latitude", value, 90.0)
}

pub fn longitude(value: Option<f64>) -> Result<Option<f64>, ApiError> {
    in_range("longitude", value, 180.0)
}

fn in_range(field: &str, value: Option<f64>, limit: f64) -> Result<Option<f64>, ApiError> {
    match value {
        Some(v) if !(-limit..=limit).contains(&v) => Err(ApiError::Validation(format!(
            "{field} must be between -{limit} and {limit}"
        ))),
        other => Ok(other),
    }
}

/// Trim, drop empty strings, and cap length.
pub fn text(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

pub fn required_text(field: &str, value: String) -> Result<String, ApiError> {
    text(field, Some(value))?.ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}
