//! # Tick and Price
//!
//! Integer log-price coordinate. The price at tick `i` is `BASE_PRICE^i`.
//!
//! Each sub-AMM works in an *oriented* tick space: `oriented = absolute` for
//! the base side and `oriented = -absolute` for the quote side. In oriented
//! space one convention serves both sides:
//!
//! - the fill price `price_at(oriented)` is the sub-AMM's inventory units per
//!   reserve unit, and it increases with the oriented tick;
//! - the reserve range sits above the current tick and is consumed upward;
//! - inventory sits below, best tick on top.
//!
//! The quote side's sign flip turns this into the expected absolute facts:
//! best base inventory is the highest absolute tick, best quote inventory the
//! lowest, and a base→quote swap walks the absolute tick downward.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::constants::{BASE_PRICE_STR, MAX_TICK, MIN_TICK};
use crate::decimal::Dec;
use crate::errors::{CoreError, CoreResult};

/// Which asset a sub-AMM holds as reserve
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Base,
    Quote,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Base => Side::Quote,
            Side::Quote => Side::Base,
        }
    }

    /// Apply this side's orientation to an absolute tick
    pub fn to_oriented(self, absolute: i32) -> i32 {
        match self {
            Side::Base => absolute,
            Side::Quote => -absolute,
        }
    }

    /// Strip this side's orientation for display and pool-level bookkeeping
    pub fn to_absolute(self, oriented: i32) -> i32 {
        // the mapping is an involution
        self.to_oriented(oriented)
    }
}

/// Validate a tick index against the supported domain
pub fn checked_tick(tick: i64) -> CoreResult<i32> {
    if tick < MIN_TICK as i64 || tick > MAX_TICK as i64 {
        return Err(CoreError::TickOutOfRange);
    }
    Ok(tick as i32)
}

/// Step a tick by a signed offset, failing on domain escape
pub fn checked_step(tick: i32, delta: i32) -> CoreResult<i32> {
    checked_tick(tick as i64 + delta as i64)
}

pub fn tick_up(tick: i32) -> CoreResult<i32> {
    checked_step(tick, 1)
}

pub fn tick_down(tick: i32) -> CoreResult<i32> {
    checked_step(tick, -1)
}

/// The tick-step price base, 1.0001
pub fn base_price() -> &'static Dec {
    static CELL: OnceLock<Dec> = OnceLock::new();
    CELL.get_or_init(|| BASE_PRICE_STR.parse().expect("BASE_PRICE literal"))
}

/// Fill price at an oriented tick: inventory units per reserve unit
pub fn price_at(oriented: i32) -> Dec {
    base_price().powi(oriented)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_round_trip() {
        for abs in [-887_272, -1000, -1, 0, 1, 1000, 887_272] {
            for side in [Side::Base, Side::Quote] {
                let oriented = side.to_oriented(abs);
                assert_eq!(side.to_absolute(oriented), abs);
            }
        }
        assert_eq!(Side::Quote.to_oriented(5), -5);
        assert_eq!(Side::Base.to_oriented(5), 5);
    }

    #[test]
    fn test_checked_tick_bounds() {
        assert_eq!(checked_tick(MAX_TICK as i64).unwrap(), MAX_TICK);
        assert_eq!(checked_tick(MIN_TICK as i64).unwrap(), MIN_TICK);
        assert_eq!(
            checked_tick(MAX_TICK as i64 + 1),
            Err(CoreError::TickOutOfRange)
        );
        assert_eq!(tick_up(MAX_TICK), Err(CoreError::TickOutOfRange));
        assert_eq!(tick_down(MIN_TICK), Err(CoreError::TickOutOfRange));
        assert_eq!(tick_up(0).unwrap(), 1);
    }

    #[test]
    fn test_price_at() {
        assert_eq!(price_at(0), Dec::one());
        assert_eq!(price_at(1), *base_price());
        // one tick in each direction multiplies/divides by the base
        let up = price_at(10);
        let down = price_at(-10);
        assert!((&up * &down - Dec::one()).abs().is_dust());
        assert!(up > Dec::one());
        assert!(down < Dec::one());
    }

    #[test]
    fn test_price_monotone_in_oriented_tick() {
        let mut prev = price_at(-5);
        for t in -4..=5 {
            let p = price_at(t);
            assert!(p > prev);
            prev = p;
        }
    }
}
