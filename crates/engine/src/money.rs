use std::{fmt, ops::Neg, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, rates::Rate};

/// Signed money amount represented as integer **minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (balances, transfer
/// amounts, posting amounts) to avoid floating-point drift. The scale is fixed
/// at 2 decimal digits for every supported currency.
///
/// The value is signed:
/// - positive = credit / increase
/// - negative = debit / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::from_minor(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition, failing with [`EngineError::AmountOutOfRange`] on
    /// overflow instead of wrapping.
    pub fn checked_add(self, rhs: Money) -> Result<Money, EngineError> {
        self.0
            .checked_add(rhs.0)
            .map(Money)
            .ok_or_else(|| EngineError::AmountOutOfRange("addition overflows".to_string()))
    }

    /// Checked subtraction, failing with [`EngineError::AmountOutOfRange`] on
    /// overflow instead of wrapping.
    pub fn checked_sub(self, rhs: Money) -> Result<Money, EngineError> {
        self.0
            .checked_sub(rhs.0)
            .map(Money)
            .ok_or_else(|| EngineError::AmountOutOfRange("subtraction overflows".to_string()))
    }

    /// Multiplies the amount by a rational exchange [`Rate`], rounding the
    /// result to minor units.
    ///
    /// Rounding policy: **half away from zero**. `100.005` becomes `100.01`
    /// and `-100.005` becomes `-100.01`. The intermediate product is computed
    /// in 128-bit arithmetic; only a result outside the `i64` minor-unit range
    /// fails with [`EngineError::AmountOutOfRange`].
    pub fn convert(self, rate: Rate) -> Result<Money, EngineError> {
        let numer = i128::from(self.0) * i128::from(rate.numer());
        let denom = i128::from(rate.denom());

        let quot = numer / denom;
        let rem = numer % denom;
        // Half away from zero: bump the quotient when the remainder reaches
        // half of the divisor, in the direction of the product's sign.
        let rounded = if rem.unsigned_abs() * 2 >= denom.unsigned_abs() {
            if numer < 0 { quot - 1 } else { quot + 1 }
        } else {
            quot
        };

        i64::try_from(rounded)
            .map(Money)
            .map_err(|_| EngineError::AmountOutOfRange("conversion overflows".to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::AmountOutOfRange("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let cents_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| invalid())?;

        let cents: i64 = match cents_str {
            None => 0,
            Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    0 => 0,
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => {
                        return Err(EngineError::InvalidAmount("too many decimals".to_string()));
                    }
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        let signed = if sign < 0 {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Money(signed))
    }
}
