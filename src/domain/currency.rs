use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mills per cent. A mill is the smallest unit the ledger tracks (1/10 cent).
pub const MILLS_PER_CENT: i64 = 10;

/// Mills per dollar.
pub const MILLS_PER_DOLLAR: i64 = 1000;

/// Money is represented as an integer count of mills to avoid floating-point drift.
/// For USD, $50.00 = 50_000 mills.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Currency(i64);

impl Currency {
    pub const ZERO: Currency = Currency(0);

    pub const fn from_mills(mills: i64) -> Self {
        Self(mills)
    }

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents * MILLS_PER_CENT)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * MILLS_PER_DOLLAR)
    }

    pub const fn mills(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// `None` when the sum does not fit.
    pub fn checked_add(self, rhs: Currency) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Currency) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

/// Format as a dollar amount.
/// Example: 50_000 -> "$50.00", -12_340 -> "-$12.34", 5 -> "$0.005"
impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs_mills = self.0.unsigned_abs();
        let units = abs_mills / MILLS_PER_DOLLAR as u64;
        let remainder = abs_mills % MILLS_PER_DOLLAR as u64;

        if remainder % MILLS_PER_CENT as u64 == 0 {
            write!(
                f,
                "{}${}.{:02}",
                sign,
                units,
                remainder / MILLS_PER_CENT as u64
            )
        } else {
            write!(f, "{}${}.{:03}", sign, units, remainder)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCurrencyError {
    #[error("invalid money format: {0:?}")]
    InvalidFormat(String),

    #[error("money amount out of range: {0:?}")]
    OutOfRange(String),
}

/// Parse a decimal string into mills.
/// Example: "50.00" -> 50_000, "$12.5" -> 12_500, "0.005" -> 5
impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let raw = input.trim();
        let invalid = || ParseCurrencyError::InvalidFormat(input.to_string());
        let overflow = || ParseCurrencyError::OutOfRange(input.to_string());

        let (negative, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let body = body.strip_prefix('$').unwrap_or(body);
        if body.is_empty() {
            return Err(invalid());
        }

        let (units_str, decimal_str) = match body.split_once('.') {
            Some((units, decimals)) => (units, decimals),
            None => (body, ""),
        };
        if decimal_str.contains('.') {
            return Err(invalid());
        }
        if !units_str.chars().all(|c| c.is_ascii_digit())
            || !decimal_str.chars().all(|c| c.is_ascii_digit())
            || (units_str.is_empty() && decimal_str.is_empty())
        {
            return Err(invalid());
        }

        let units: i64 = if units_str.is_empty() {
            0
        } else {
            units_str.parse().map_err(|_| overflow())?
        };

        // Pad to three digits, truncate anything below a mill
        let mut fraction = decimal_str.chars().take(3).collect::<String>();
        while fraction.len() < 3 {
            fraction.push('0');
        }
        let fraction_mills: i64 = fraction.parse().map_err(|_| invalid())?;

        let mills = units
            .checked_mul(MILLS_PER_DOLLAR)
            .and_then(|m| m.checked_add(fraction_mills))
            .ok_or_else(overflow)?;

        Ok(Currency(if negative { -mills } else { mills }))
    }
}

impl Add for Currency {
    type Output = Currency;

    fn add(self, rhs: Currency) -> Currency {
        Currency(self.0 + rhs.0)
    }
}

impl Sub for Currency {
    type Output = Currency;

    fn sub(self, rhs: Currency) -> Currency {
        Currency(self.0 - rhs.0)
    }
}

impl Neg for Currency {
    type Output = Currency;

    fn neg(self) -> Currency {
        Currency(-self.0)
    }
}

impl AddAssign for Currency {
    fn add_assign(&mut self, rhs: Currency) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Currency {
    fn sub_assign(&mut self, rhs: Currency) {
        self.0 -= rhs.0;
    }
}

impl Sum for Currency {
    fn sum<I: Iterator<Item = Currency>>(iter: I) -> Currency {
        iter.fold(Currency::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Currency> for Currency {
    fn sum<I: Iterator<Item = &'a Currency>>(iter: I) -> Currency {
        iter.copied().sum()
    }
}
