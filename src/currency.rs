//! Conversion of original-currency amounts into whole home-currency units.
//!
//! Conversion happens exactly once, when an expense is created; the result
//! is stored on the record and never revisited when rates change.

use std::collections::HashMap;

use crate::error::LedgerError;
use crate::schemas::ExchangeRate;

/// All reporting is normalized to Israeli shekels.
pub const HOME_CURRENCY: &str = "ILS";

/// Snapshot of the rate table: uppercase currency code to the factor that
/// converts one unit of that currency into ILS.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RateTable(HashMap<String, f64>);

impl RateTable {
    pub fn new() -> RateTable {
        RateTable::default()
    }

    pub fn from_rates(rates: &[ExchangeRate]) -> RateTable {
        RateTable(
            rates
                .iter()
                .map(|r| (r.currency.to_ascii_uppercase(), r.rate))
                .collect(),
        )
    }

    pub fn insert(&mut self, currency: &str, rate: f64) {
        self.0.insert(currency.to_ascii_uppercase(), rate);
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.0.get(&currency.to_ascii_uppercase()).copied()
    }
}

/// Converts `amount` of `currency` into whole shekels, round-half-up.
///
/// The home currency converts at identity (still rounded). Any other code
/// must be present in the rate table: an unrecognized currency is an error,
/// never an implicit rate of 1.
pub fn normalize_to_home(
    amount: f64,
    currency: &str,
    rates: &RateTable,
) -> Result<i64, LedgerError> {
    if !amount.is_finite() {
        return Err(LedgerError::InvalidAmount(format!(
            "{amount} is not a finite number"
        )));
    }
    if amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(format!(
            "{amount} must be positive"
        )));
    }
    let code = currency.to_ascii_uppercase();
    if code == HOME_CURRENCY {
        return Ok(round_half_up(amount));
    }
    match rates.get(&code) {
        Some(rate) => Ok(round_half_up(amount * rate)),
        None => Err(LedgerError::UnknownCurrency(code)),
    }
}

// Amounts are positive here, so away-from-zero rounding is half-up.
fn round_half_up(value: f64) -> i64 {
    value.round() as i64
}
