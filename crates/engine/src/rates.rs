//! Exchange rates.
//!
//! Rates are exact rationals, never floats: `USD -> EUR` at 0.92 is stored as
//! `92/100`, and the reverse direction is quoted as the exact reciprocal
//! `100/92`. Reciprocal quoting means a round trip does not conserve value
//! (real desks quote a bid/ask spread instead); this mirrors the behavior of
//! the system this engine replaces and callers must not assume conservation
//! across a currency boundary.

use std::fmt;

use crate::{Currency, EngineError};

/// A rational exchange rate for an ordered currency pair.
///
/// `amount_to = amount_from * numer / denom`, rounded by
/// [`Money::convert`](crate::Money::convert).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rate {
    numer: i64,
    denom: i64,
}

impl Rate {
    /// Builds a rate from a positive numerator/denominator pair.
    pub fn new(numer: i64, denom: i64) -> Result<Self, EngineError> {
        if numer <= 0 || denom <= 0 {
            return Err(EngineError::InvalidAmount(
                "exchange rate must be positive".to_string(),
            ));
        }
        Ok(Self { numer, denom })
    }

    #[must_use]
    pub const fn numer(self) -> i64 {
        self.numer
    }

    #[must_use]
    pub const fn denom(self) -> i64 {
        self.denom
    }

    /// The exact reciprocal rate (quote for the opposite direction).
    #[must_use]
    pub const fn reciprocal(self) -> Rate {
        Rate {
            numer: self.denom,
            denom: self.numer,
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numer, self.denom)
    }
}

/// Supplies the conversion rate for an ordered currency pair.
///
/// Engines resolve the rate **before** opening their atomic unit, so a
/// provider may be slow or remote without ever being invoked under account
/// locks. Implementations must be deterministic for a given pair at a given
/// point in time.
pub trait RateProvider: Send + Sync + fmt::Debug {
    fn rate(&self, from: Currency, to: Currency) -> Result<Rate, EngineError>;
}

/// The built-in provider: a fixed `USD -> EUR` rate, reverse quoted as the
/// exact reciprocal.
#[derive(Clone, Copy, Debug)]
pub struct FixedRateProvider {
    usd_to_eur: Rate,
}

impl FixedRateProvider {
    pub fn new(usd_to_eur: Rate) -> Self {
        Self { usd_to_eur }
    }
}

impl Default for FixedRateProvider {
    fn default() -> Self {
        Self {
            usd_to_eur: Rate { numer: 92, denom: 100 },
        }
    }
}

impl RateProvider for FixedRateProvider {
    fn rate(&self, from: Currency, to: Currency) -> Result<Rate, EngineError> {
        match (from, to) {
            (Currency::Usd, Currency::Eur) => Ok(self.usd_to_eur),
            (Currency::Eur, Currency::Usd) => Ok(self.usd_to_eur.reciprocal()),
            (from, to) => Err(EngineError::InvalidAmount(format!(
                "no rate quoted for {from} -> {to}"
            ))),
        }
    }
}
