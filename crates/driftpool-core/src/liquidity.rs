//! # Liquidity Book
//!
//! Per sub-AMM: at most one reserve range above the current tick and an
//! ordered run of inventory ranges below it (front = best). The book feeds
//! the current-tick state machine one tick at a time and lends its worst
//! inventory tick to the recovery bin through a borrow-with-callback so the
//! tick is restored on every non-consuming exit path.

use std::collections::VecDeque;

use crate::decimal::Dec;
use crate::errors::{CoreError, CoreResult};
use crate::range::{InventoryRange, InventoryTick, ReserveRange};
use crate::tick::{checked_step, price_at};

/// Outcome of a worst-tick borrow
#[derive(Debug)]
pub enum Borrowed {
    /// Put this (possibly reduced) slice back as the new worst
    Keep(InventoryTick),
    /// The tick was fully consumed
    Resolved,
}

#[derive(Clone, Debug)]
pub struct Liquidity {
    reserve: Option<ReserveRange>,
    /// front = best (nearest the price), back = worst
    inventory: VecDeque<InventoryRange>,
    /// set when the uniform per-tick reserve changed; the next inventory
    /// deposit must start a fresh range instead of merging
    spawn_new_inventory: bool,
    /// minimum reserve width for drifting sub-AMMs, `None` for stable
    drift_span: Option<i32>,
}

impl Liquidity {
    pub fn new(drift_span: Option<i32>) -> Self {
        Liquidity {
            reserve: None,
            inventory: VecDeque::new(),
            spawn_new_inventory: false,
            drift_span,
        }
    }

    // ========================================================================
    // Reserve side
    // ========================================================================

    pub fn has_reserve(&self) -> bool {
        self.reserve.is_some()
    }

    pub fn reserve_qty(&self) -> Dec {
        self.reserve
            .as_ref()
            .map(|r| r.qty().clone())
            .unwrap_or_else(Dec::zero)
    }

    pub fn reserve_bounds(&self) -> Option<(i32, i32)> {
        self.reserve.as_ref().map(|r| r.bounds())
    }

    pub fn reserve_width(&self) -> i32 {
        self.reserve.as_ref().map(|r| r.width()).unwrap_or(0)
    }

    /// Create the reserve window; no-op when one already exists
    pub fn init_reserve(&mut self, left: i32, right: i32) -> CoreResult<()> {
        if self.reserve.is_none() {
            self.reserve = Some(ReserveRange::new(left, right, Dec::zero())?);
        }
        Ok(())
    }

    /// Uniform deposit across the existing window
    pub fn deposit_reserve(&mut self, qty: Dec) -> CoreResult<()> {
        match &mut self.reserve {
            Some(r) => r.put(qty),
            None => Err(CoreError::EmptyRange),
        }
    }

    pub fn notify_reserve_changed(&mut self) {
        self.spawn_new_inventory = true;
    }

    pub fn withdraw_reserve_cut(&mut self, cut: &Dec) -> Dec {
        match &mut self.reserve {
            Some(r) => r.withdraw_cut(cut),
            None => Dec::zero(),
        }
    }

    /// Retarget the reserve window's far boundary. Extensions always apply;
    /// a shrink is declined when it would leave the window narrower than the
    /// drifting span. Returns whether anything moved.
    pub fn drift_worst(&mut self, target: i32) -> CoreResult<bool> {
        let Some(span) = self.drift_span else {
            return Ok(false);
        };
        let Some(r) = &mut self.reserve else {
            return Ok(false);
        };
        let (left, right) = r.bounds();
        if target > right {
            r.stretch_to(target)?;
            return Ok(true);
        }
        let floor = checked_step(left, span - 1)?;
        let new_right = target.max(floor);
        if new_right >= right {
            return Ok(false);
        }
        r.drift_worst(new_right)?;
        Ok(true)
    }

    // ========================================================================
    // Inventory side
    // ========================================================================

    pub fn inventory_ranges(&self) -> impl Iterator<Item = &InventoryRange> {
        self.inventory.iter()
    }

    pub fn total_inventory(&self) -> Dec {
        self.inventory.iter().map(|r| r.qty().clone()).sum()
    }

    /// Reserve originally spent for everything the book holds
    pub fn respective_reserve(&self) -> Dec {
        self.inventory.iter().map(|r| r.respective_reserve()).sum()
    }

    /// Oriented index of the worst inventory tick, if any
    pub fn worst_inventory_tick(&self) -> Option<i32> {
        self.inventory.back().map(|r| r.bounds().0)
    }

    fn put_best_inventory(&mut self, qty: Dec, tick: i32) -> CoreResult<()> {
        if qty.is_zero() {
            return Ok(());
        }
        if !self.spawn_new_inventory {
            if let Some(front) = self.inventory.front_mut() {
                if front.bounds().1 + 1 == tick {
                    return front.put_best(qty, tick);
                }
            }
        }
        self.inventory
            .push_front(InventoryRange::new_single(tick, qty)?);
        self.spawn_new_inventory = false;
        Ok(())
    }

    // ========================================================================
    // State-machine feeds
    // ========================================================================

    /// Deposit the vacated tick's inventory, then peel the best reserve tick
    /// for the advancing cursor. The reserve range is contiguous and pinned
    /// to the price, so its best tick is either exactly `tick` or absent.
    pub fn obtain_reserve_tick(
        &mut self,
        inventory_backing: Option<InventoryTick>,
        tick: i32,
    ) -> CoreResult<Option<(Dec, i32)>> {
        if let Some(snap) = inventory_backing {
            self.put_best_inventory(snap.qty, snap.tick)?;
        }
        let Some(r) = &mut self.reserve else {
            return Ok(None);
        };
        if r.peek_best()?.1 != tick {
            return Err(CoreError::InvariantViolation(
                "reserve range detached from the current tick",
            ));
        }
        let out = r.take_best()?;
        if r.is_empty() {
            self.reserve = None;
        }
        Ok(Some(out))
    }

    /// Deposit the vacated tick's residual reserve, then pop the best
    /// inventory tick, but only if it sits exactly at `tick`. Inventory may
    /// have gaps; a mismatch means the cursor is crossing a void and the
    /// outer advance continues.
    pub fn obtain_inventory_tick(
        &mut self,
        reserve_backing: Dec,
        tick: i32,
    ) -> CoreResult<Option<(Dec, i32)>> {
        match &mut self.reserve {
            Some(r) => {
                if r.bounds().0 != tick + 2 {
                    return Err(CoreError::InvariantViolation(
                        "reserve range detached from the vacated tick",
                    ));
                }
                r.put_best(reserve_backing)?;
            }
            None => {
                if !reserve_backing.is_zero() {
                    let vacated = checked_step(tick, 1)?;
                    self.reserve = Some(ReserveRange::new(vacated, vacated, reserve_backing)?);
                }
            }
        }
        let Some(front) = self.inventory.front_mut() else {
            return Ok(None);
        };
        if front.peek_best()?.1 != tick {
            return Ok(None);
        }
        let out = front.take_best()?;
        if front.is_empty() {
            self.inventory.pop_front();
        }
        Ok(Some(out))
    }

    // ========================================================================
    // Recovery borrow
    // ========================================================================

    /// Lend the worst inventory tick to `f`. `Keep` reinserts the returned
    /// slice (folded back when untouched, standalone when reduced),
    /// `Resolved` drops the tick, and an error restores the original before
    /// propagating.
    pub fn with_worst_inventory<T>(
        &mut self,
        f: impl FnOnce(InventoryTick) -> CoreResult<(Borrowed, T)>,
    ) -> CoreResult<Option<T>> {
        let Some(back) = self.inventory.back_mut() else {
            return Ok(None);
        };
        let (qty, tick) = back.take_worst()?;
        if back.is_empty() {
            self.inventory.pop_back();
        }
        let borrowed = InventoryTick {
            qty: qty.clone(),
            tick,
        };
        match f(borrowed) {
            Ok((Borrowed::Resolved, value)) => Ok(Some(value)),
            Ok((Borrowed::Keep(leftover), value)) => {
                self.restore_worst(leftover, &qty)?;
                Ok(Some(value))
            }
            Err(e) => {
                self.restore_worst(InventoryTick { qty: qty.clone(), tick }, &qty)?;
                Err(e)
            }
        }
    }

    fn restore_worst(&mut self, slice: InventoryTick, original_qty: &Dec) -> CoreResult<()> {
        if slice.qty.is_zero() {
            return Ok(());
        }
        // an untouched borrow folds back into the range it came from
        if slice.qty == *original_qty {
            if let Some(back) = self.inventory.back_mut() {
                if back.bounds().0 == slice.tick + 1 {
                    return back.put_worst(slice.qty, slice.tick);
                }
            }
        }
        self.inventory
            .push_back(InventoryRange::new_single(slice.tick, slice.qty)?);
        Ok(())
    }

    // ========================================================================
    // Withdrawal drain
    // ========================================================================

    /// Remove inventory worst-first until the drained respective reserve
    /// reaches `target`. Returns the drained inventory quantity.
    pub fn drain_worst_inventory(&mut self, target: Dec) -> CoreResult<Dec> {
        let mut remaining = target;
        let mut drained = Dec::zero();
        while !remaining.is_dust() {
            let Some(back) = self.inventory.back_mut() else {
                return Err(CoreError::InvariantViolation(
                    "respective-reserve deficit exceeds available inventory",
                ));
            };
            let (wq, wt) = back.peek_worst()?;
            let tick_resp = &wq / &price_at(wt);
            back.take_worst()?;
            if back.is_empty() {
                self.inventory.pop_back();
            }
            if tick_resp <= remaining {
                drained += wq;
                remaining -= tick_resp;
            } else {
                let fraction = &remaining / &tick_resp;
                let part = &wq * &fraction;
                let leftover = &wq - &part;
                if !leftover.is_dust() {
                    self.inventory
                        .push_back(InventoryRange::new_single(wt, leftover)?);
                }
                drained += part;
                remaining = Dec::zero();
            }
        }
        Ok(drained)
    }
}
