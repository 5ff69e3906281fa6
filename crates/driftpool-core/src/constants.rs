//! # Engine Constants
//!
//! Tick-domain bounds, the log-price base, decimal precision, and default
//! pool parameters.

// ============================================================================
// Tick Domain
// ============================================================================

/// Minimum tick index (absolute and oriented)
pub const MIN_TICK: i32 = -887_272;

/// Maximum tick index (absolute and oriented)
pub const MAX_TICK: i32 = 887_272;

/// Price of one tick step: price(i) = BASE_PRICE^i
pub const BASE_PRICE_STR: &str = "1.0001";

// ============================================================================
// Decimal Precision
// ============================================================================

/// Fractional digits kept after every rounding operation.
///
/// The full tick domain spans prices around 1e±38, so respective-reserve
/// quotients can reach ~1e-45; 64 fractional digits leave ample headroom.
pub const DECIMAL_SCALE: i64 = 64;

/// Quantities below 1e-48 are treated as exhausted by the fill loop.
pub const DUST_EXP: i64 = 48;

// ============================================================================
// Default Pool Parameters
// ============================================================================

/// Default minimum fee factor (0.05%)
pub const DEFAULT_MIN_FEE_STR: &str = "0.0005";

/// Default maximum fee factor (1%)
pub const DEFAULT_MAX_FEE_STR: &str = "0.01";

/// Default share of deposits and fees routed to the stable sub-AMMs
pub const DEFAULT_STABLE_SHARE_STR: &str = "0.5";

/// Default width of a drifting sub-AMM's reserve window, in ticks
pub const DEFAULT_TICK_SPAN: i32 = 1000;

/// IL value at which the IL fee term saturates
pub const IL_FEE_MIDPOINT_STR: &str = "0.5";
