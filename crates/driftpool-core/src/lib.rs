//! # driftpool-core: Concentrated Liquidity with IL Recovery
//!
//! The swap/liquidity engine of a simulated automated market maker. A pool
//! coordinates four sub-AMMs (`{stable, drifting} × {base, quote}`) over a
//! shared logarithmically-spaced tick index:
//!
//! - each sub-AMM keeps idle **reserve** uniformly above the price and
//!   acquired **inventory** geometrically below it;
//! - swap fees accumulate as collateral in per-sub-AMM **recovery bins**,
//!   which buy back the worst underwater inventory tick at the current price;
//! - **drifting** sub-AMMs concentrate their reserve in a window that tracks
//!   the opposite side's worst inventory.
//!
//! The engine is single-threaded cooperative: one swap occupies a pool from
//! start to completion and there are no suspension points. Errors are fatal
//! to the operation; [`Pool`] is `Clone`, so callers wanting atomic try-swap
//! semantics clone first and adopt the clone on success.

pub mod amm;
pub mod constants;
pub mod current_tick;
pub mod decimal;
pub mod errors;
pub mod liquidity;
pub mod pool;
pub mod range;
pub mod recovery;
pub mod tick;

// Re-export commonly used items
pub use amm::{Amm, AmmKind, Fill};
pub use decimal::Dec;
pub use errors::{CoreError, CoreResult};
pub use pool::{
    InitialReserves, LiquidityDigest, Pool, PoolConfig, PoolStats, Reserves, SwapDirection,
    SwapOutcome,
};
pub use tick::Side;
