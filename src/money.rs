//! Currency amounts and fee percentages.
//!
//! Amounts are held as integer minor units (1/100 of the currency unit) so
//! fee arithmetic never touches floating point. Percentage-derived fees are
//! rounded half-up to a whole currency unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minor units per whole currency unit.
pub const MINOR_PER_UNIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("invalid amount: {input}")]
    InvalidAmount { input: String },
    #[error("amount out of range: {input}")]
    OutOfRange { input: String },
    #[error("percentage must be between 0 and 100, got {value}")]
    PercentageOutOfRange { value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Whole currency units, e.g. `Money::from_major(100_000)`.
    pub const fn from_major(major: i64) -> Self {
        Money(major * MINOR_PER_UNIT)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `self * percentage / 100`, rounded half-up to a whole currency unit.
    ///
    /// The result never exceeds `self` in magnitude, so it cannot overflow.
    pub fn percentage_of(self, percentage: Percentage) -> Money {
        let scaled = self.0.unsigned_abs() as u128 * percentage.value() as u128;
        let denominator = 100u128 * MINOR_PER_UNIT as u128;
        let whole_units = (scaled + denominator / 2) / denominator;
        let minor = whole_units as i64 * MINOR_PER_UNIT;
        if self.0 < 0 {
            Money(-minor)
        } else {
            Money(minor)
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = MINOR_PER_UNIT as u64;
        write!(f, "{}{}.{:02}", sign, abs / unit, abs % unit)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Accepts `"100000"`, `"100000.5"` and `"100000.50"`; `_` may group digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MoneyError::InvalidAmount { input: s.to_string() };
        let out_of_range = || MoneyError::OutOfRange { input: s.to_string() };

        let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if major_str.is_empty() || !all_digits(major_str) || !all_digits(minor_str) || minor_str.len() > 2 {
            return Err(invalid());
        }

        let major: i64 = major_str.parse().map_err(|_| out_of_range())?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => minor_str.parse().map_err(|_| invalid())?,
        };

        let total = major
            .checked_mul(MINOR_PER_UNIT)
            .and_then(|m| m.checked_add(minor))
            .ok_or_else(out_of_range)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

/// Integer percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percentage(u8);

impl Percentage {
    pub const DEFAULT_JASPEL: Percentage = Percentage(40);

    pub fn new(value: u32) -> Result<Self, MoneyError> {
        if value > 100 {
            return Err(MoneyError::PercentageOutOfRange { value });
        }
        Ok(Percentage(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Self::DEFAULT_JASPEL
    }
}

impl TryFrom<u32> for Percentage {
    type Error = MoneyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Percentage::new(value)
    }
}

impl From<Percentage> for u32 {
    fn from(p: Percentage) -> Self {
        p.0 as u32
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
