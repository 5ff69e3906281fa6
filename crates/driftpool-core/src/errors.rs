//! # Core Error Types
//!
//! Every error is fatal to the operation that raised it: the engine never
//! retries and never partially commits. Callers that need try-swap semantics
//! clone the pool first and adopt the clone on success.
//!
//! Division by zero is not represented here; it panics inside the decimal
//! layer and is never catchable.

use thiserror::Error;

/// Engine errors surfaced to the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Tick arithmetic escaped the supported range")]
    TickOutOfRange,

    #[error("Operation on a zero-width range")]
    EmptyRange,

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("Swap would exhaust every tick of available liquidity")]
    PriceImpactTooLarge,
}

/// Result type using core errors
pub type CoreResult<T> = Result<T, CoreError>;
