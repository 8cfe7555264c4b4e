//! Identifier format validation and masking.
//!
//! MC numbers are the FMCSA docket numbers being sold; DOT numbers identify
//! the carrier. Both are sensitive listing fields: buyers see masked forms
//! until the unlock gate grants disclosure.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, Result};

/// Regex for valid MC numbers: "MC-" followed by 4 to 8 digits.
static MC_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MC-\d{4,8}$").unwrap_or_else(|_| unreachable!()));

/// Regex for valid DOT numbers: 5 to 8 digits, no prefix.
static DOT_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5,8}$").unwrap_or_else(|_| unreachable!()));

/// Number of leading digits left visible when masking.
const VISIBLE_DIGITS: usize = 2;

/// Validate an MC number.
///
/// # Errors
///
/// Returns an error if the value is not of the form `MC-` followed by
/// 4-8 digits.
pub fn validate_mc_number(value: &str) -> Result<()> {
    if MC_NUMBER_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(CoreError::InvalidMcNumber(format!(
            "expected MC- followed by 4-8 digits, got '{value}'"
        )))
    }
}

/// Validate a DOT number.
///
/// # Errors
///
/// Returns an error if the value is not 5-8 digits.
pub fn validate_dot_number(value: &str) -> Result<()> {
    if DOT_NUMBER_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(CoreError::InvalidDotNumber(format!(
            "expected 5-8 digits, got '{value}'"
        )))
    }
}

/// Mask an MC number for undisclosed display.
///
/// Keeps the `MC-` prefix and the first two digits, replacing the rest with
/// bullets: `MC-123456` becomes `MC-12••••`.
#[must_use]
pub fn mask_mc_number(value: &str) -> String {
    match value.strip_prefix("MC-") {
        Some(digits) => format!("MC-{}", mask_digits(digits)),
        None => mask_digits(value),
    }
}

/// Mask a DOT number for undisclosed display.
///
/// Keeps the first two digits: `7654321` becomes `76•••••`.
#[must_use]
pub fn mask_dot_number(value: &str) -> String {
    mask_digits(value)
}

fn mask_digits(digits: &str) -> String {
    digits
        .chars()
        .enumerate()
        .map(|(i, c)| if i < VISIBLE_DIGITS { c } else { '•' })
        .collect()
}
