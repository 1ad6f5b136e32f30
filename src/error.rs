use thiserror::Error;

/// Errors the balance engine can raise. Anything recoverable per-record
/// (a stale payer reference, for instance) is surfaced as a warning on
/// the computed snapshot instead, so one bad record never invalidates
/// the whole derived state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("unknown currency \"{0}\": no exchange rate on record")]
    UnknownCurrency(String),
    #[error("balance requires exactly two participants, got {0}")]
    UnbalancedParticipantSet(usize),
}
