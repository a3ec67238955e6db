//! Fixed-point conversion between human-entered decimal strings and on-chain integers.
//!
//! Every conversion takes the decimal count explicitly; callers obtain it from the
//! token registry rather than hard-coding it.

use std::fmt;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TokenId;

/// Fraction digits shown by [`format_compact`].
pub const COMPACT_FRACTION_DIGITS: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,
    #[error("'{0}' is not a decimal number")]
    NotNumeric(String),
    #[error("amount has more than {max} decimal places")]
    TooManyDecimals { max: u8 },
    #[error("amount is too large")]
    Overflow,
}

/// Keystroke filter: digits with at most one decimal point, or empty.
pub fn is_amount_input(input: &str) -> bool {
    let mut seen_dot = false;
    input.chars().all(|c| match c {
        '0'..='9' => true,
        '.' if !seen_dot => {
            seen_dot = true;
            true
        }
        _ => false,
    })
}

/// 10^77 is the largest power of ten a `U256` holds.
pub const MAX_DECIMALS: u8 = 77;

fn ten_pow(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

pub fn parse_units(input: &str, decimals: u8) -> Result<U256, UnitsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Empty);
    }
    if trimmed == "." || !is_amount_input(trimmed) {
        return Err(UnitsError::NotNumeric(trimmed.to_string()));
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if fraction.len() > usize::from(decimals) {
        return Err(UnitsError::TooManyDecimals { max: decimals });
    }

    let padding = usize::from(decimals) - fraction.len();
    let mut digits = String::with_capacity(whole.len() + usize::from(decimals));
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat('0').take(padding));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| UnitsError::Overflow)
}

/// Canonical decimal rendering: no trailing fraction zeros, no dangling point.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let raw = amount.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return raw;
    }

    let padded = if raw.len() <= decimals {
        format!("{}{raw}", "0".repeat(decimals + 1 - raw.len()))
    } else {
        raw
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Display rendering rounded to six fraction digits; tiny non-zero values show as `< 0.000001`.
pub fn format_compact(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    if decimals <= COMPACT_FRACTION_DIGITS {
        return format_units(amount, decimals);
    }

    let scale = ten_pow(decimals - COMPACT_FRACTION_DIGITS);
    if amount < scale {
        return "< 0.000001".to_string();
    }
    let half = scale / U256::from(2u64);
    let rounded = amount.saturating_add(half) / scale;
    format_units(rounded, COMPACT_FRACTION_DIGITS)
}

/// An on-chain integer amount tagged with the token it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: TokenId,
    pub raw: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(token: TokenId, raw: U256, decimals: u8) -> Self {
        Self {
            token,
            raw,
            decimals,
        }
    }

    pub fn zero(token: TokenId, decimals: u8) -> Self {
        Self::new(token, U256::ZERO, decimals)
    }

    pub fn display(&self) -> String {
        format_units(self.raw, self.decimals)
    }

    pub fn compact(&self) -> String {
        format_compact(self.raw, self.decimals)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.display(), self.token)
    }
}
