//! # Liquidity Ranges
//!
//! A range is a contiguous closed interval of oriented ticks holding a total
//! quantity. Reserve ranges distribute uniformly; inventory ranges
//! geometrically, shaped so that the respective reserve (inventory divided by
//! the fill price of its tick) is the same at every tick of the range.
//!
//! Reserve lives above the current tick, so its best tick (first consumed) is
//! the `left` boundary. Inventory lives below, best tick is `right`.

use crate::decimal::Dec;
use crate::errors::{CoreError, CoreResult};
use crate::tick::{base_price, checked_step, checked_tick, price_at};

/// A worst- or best-tick snapshot moved between the book, the current tick
/// and the recovery bin
#[derive(Clone, Debug)]
pub struct InventoryTick {
    pub qty: Dec,
    pub tick: i32,
}

// ============================================================================
// Reserve
// ============================================================================

/// Uniformly distributed idle liquidity above the current tick
#[derive(Clone, Debug)]
pub struct ReserveRange {
    left: i32,
    right: i32,
    qty: Dec,
}

impl ReserveRange {
    pub fn new(left: i32, right: i32, qty: Dec) -> CoreResult<Self> {
        checked_tick(left as i64)?;
        checked_tick(right as i64)?;
        if left > right {
            return Err(CoreError::EmptyRange);
        }
        if qty.is_negative() {
            return Err(CoreError::InvariantViolation("negative reserve quantity"));
        }
        Ok(ReserveRange { left, right, qty })
    }

    pub fn width(&self) -> i32 {
        if self.left > self.right {
            0
        } else {
            self.right - self.left + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0
    }

    pub fn qty(&self) -> &Dec {
        &self.qty
    }

    pub fn bounds(&self) -> (i32, i32) {
        (self.left, self.right)
    }

    /// Uniform slice held by every tick of the range
    pub fn per_tick(&self) -> CoreResult<Dec> {
        if self.is_empty() {
            return Err(CoreError::EmptyRange);
        }
        Ok(&self.qty / &Dec::from(self.width()))
    }

    pub fn peek_best(&self) -> CoreResult<(Dec, i32)> {
        Ok((self.per_tick()?, self.left))
    }

    pub fn peek_worst(&self) -> CoreResult<(Dec, i32)> {
        Ok((self.per_tick()?, self.right))
    }

    /// Peel the tick nearest the price off the range
    pub fn take_best(&mut self) -> CoreResult<(Dec, i32)> {
        let (slice, tick) = self.peek_best()?;
        self.left += 1;
        self.qty -= &slice;
        Ok((slice, tick))
    }

    pub fn take_worst(&mut self) -> CoreResult<(Dec, i32)> {
        let (slice, tick) = self.peek_worst()?;
        self.right -= 1;
        self.qty -= &slice;
        Ok((slice, tick))
    }

    /// Add liquidity uniformly across the existing width
    pub fn put(&mut self, qty: Dec) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyRange);
        }
        self.qty += qty;
        Ok(())
    }

    /// Extend the range one tick toward the price, folding `qty` into the
    /// uniform total
    pub fn put_best(&mut self, qty: Dec) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyRange);
        }
        self.left = checked_step(self.left, -1)?;
        self.qty += qty;
        Ok(())
    }

    /// Remove `cut` of the total without changing the width
    pub fn withdraw_cut(&mut self, cut: &Dec) -> Dec {
        let out = &self.qty * cut;
        self.qty -= &out;
        out
    }

    /// Grow the far boundary outward; never shrinks
    pub fn stretch_to(&mut self, target: i32) -> CoreResult<()> {
        checked_tick(target as i64)?;
        if target > self.right {
            self.right = target;
        }
        Ok(())
    }

    /// Move the far boundary (the drifting-window retarget); the caller
    /// guards the minimum width
    pub fn drift_worst(&mut self, new_worst: i32) -> CoreResult<()> {
        checked_tick(new_worst as i64)?;
        if self.is_empty() {
            return Err(CoreError::EmptyRange);
        }
        if new_worst < self.left {
            return Err(CoreError::InvariantViolation(
                "drift target crosses the best reserve boundary",
            ));
        }
        self.right = new_worst;
        Ok(())
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// Geometrically distributed acquired liquidity below the current tick.
///
/// Per-tick quantity at tick `t` is proportional to `BASE_PRICE^t`, so the
/// respective reserve per tick is uniform. Closed form from the total:
/// `best = qty·(1 − 1/B)/(1 − B^(−width))`, `worst = best·B^(−(width−1))`.
#[derive(Clone, Debug)]
pub struct InventoryRange {
    left: i32,
    right: i32,
    qty: Dec,
}

impl InventoryRange {
    /// A one-tick range, the seed of every inventory run
    pub fn new_single(tick: i32, qty: Dec) -> CoreResult<Self> {
        checked_tick(tick as i64)?;
        if qty.is_negative() {
            return Err(CoreError::InvariantViolation("negative inventory quantity"));
        }
        Ok(InventoryRange {
            left: tick,
            right: tick,
            qty,
        })
    }

    pub fn width(&self) -> i32 {
        if self.left > self.right {
            0
        } else {
            self.right - self.left + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0
    }

    pub fn qty(&self) -> &Dec {
        &self.qty
    }

    pub fn bounds(&self) -> (i32, i32) {
        (self.left, self.right)
    }

    /// Quantity at the tick nearest the price (the largest slice)
    pub fn best_tick_qty(&self) -> CoreResult<Dec> {
        let w = self.width();
        if w == 0 {
            return Err(CoreError::EmptyRange);
        }
        if w == 1 {
            return Ok(self.qty.clone());
        }
        let num = Dec::one() - base_price().powi(-1);
        let den = Dec::one() - base_price().powi(-w);
        Ok(&self.qty * &num / &den)
    }

    /// Quantity at the tick farthest from the price (the smallest slice)
    pub fn worst_tick_qty(&self) -> CoreResult<Dec> {
        let w = self.width();
        if w == 0 {
            return Err(CoreError::EmptyRange);
        }
        if w == 1 {
            return Ok(self.qty.clone());
        }
        Ok(&self.best_tick_qty()? * &base_price().powi(-(w - 1)))
    }

    pub fn peek_best(&self) -> CoreResult<(Dec, i32)> {
        Ok((self.best_tick_qty()?, self.right))
    }

    pub fn peek_worst(&self) -> CoreResult<(Dec, i32)> {
        Ok((self.worst_tick_qty()?, self.left))
    }

    pub fn take_best(&mut self) -> CoreResult<(Dec, i32)> {
        let (slice, tick) = self.peek_best()?;
        self.right -= 1;
        self.qty -= &slice;
        Ok((slice, tick))
    }

    pub fn take_worst(&mut self) -> CoreResult<(Dec, i32)> {
        let (slice, tick) = self.peek_worst()?;
        self.left += 1;
        self.qty -= &slice;
        Ok((slice, tick))
    }

    /// Grow the range by one tick toward the price. The new tick must sit
    /// exactly adjacent to the current best; non-adjacent inventory belongs
    /// in a fresh range.
    pub fn put_best(&mut self, qty: Dec, tick: i32) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyRange);
        }
        if tick != self.right + 1 {
            return Err(CoreError::InvariantViolation(
                "inventory extension not adjacent to the best tick",
            ));
        }
        checked_tick(tick as i64)?;
        self.right = tick;
        self.qty += qty;
        Ok(())
    }

    /// Grow the range by one tick away from the price; used to fold an
    /// untouched worst-tick borrow back in
    pub fn put_worst(&mut self, qty: Dec, tick: i32) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyRange);
        }
        if tick != self.left - 1 {
            return Err(CoreError::InvariantViolation(
                "inventory extension not adjacent to the worst tick",
            ));
        }
        checked_tick(tick as i64)?;
        self.left = tick;
        self.qty += qty;
        Ok(())
    }

    pub fn withdraw_cut(&mut self, cut: &Dec) -> Dec {
        let out = &self.qty * cut;
        self.qty -= &out;
        out
    }

    /// Reserve originally spent to acquire this range: uniform per tick, so
    /// width times the best tick's share. Zero when empty.
    pub fn respective_reserve(&self) -> Dec {
        let Ok(best) = self.best_tick_qty() else {
            return Dec::zero();
        };
        let per_tick = &best / &price_at(self.right);
        &per_tick * &Dec::from(self.width())
    }
}
