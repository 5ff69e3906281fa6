//! # Current Tick
//!
//! The active price level where swaps fill. The tick owns four accumulators
//! bound by the fill constraint
//! `current_inventory + current_reserve·price = target_reserve·price`,
//! plus the sub-AMM's recovery bin.
//!
//! The swap loop is a finite-state machine: fills report `tick_exhausted`
//! and the owner advances the cursor one tick at a time, exchanging residual
//! balances with the liquidity book on every step.

use std::mem;

use crate::decimal::Dec;
use crate::errors::{CoreError, CoreResult};
use crate::liquidity::Liquidity;
use crate::range::InventoryTick;
use crate::recovery::RecoveryBin;
use crate::tick::{checked_tick, price_at, tick_down, tick_up};

/// Result of one fill attempt at the active tick
#[derive(Clone, Debug)]
pub struct FillOutcome {
    /// Output units handed to the trader (inventory or reserve, by direction)
    pub qty_out: Dec,
    /// Unconsumed input
    pub remainder_in: Dec,
    /// Reserve recovered by the bin during this fill
    pub recovered_reserve: Dec,
    /// The providing side is empty; the cursor must advance to continue
    pub tick_exhausted: bool,
}

#[derive(Clone, Debug)]
pub struct CurrentTick {
    tick: i32,
    /// cached `price_at(tick)`
    price: Dec,
    target_reserve: Dec,
    current_reserve: Dec,
    target_inventory: Dec,
    current_inventory: Dec,
    recovery: RecoveryBin,
}

impl CurrentTick {
    pub fn new(oriented_tick: i32, sell_unused_collateral: bool) -> CoreResult<Self> {
        checked_tick(oriented_tick as i64)?;
        Ok(CurrentTick {
            tick: oriented_tick,
            price: price_at(oriented_tick),
            target_reserve: Dec::zero(),
            current_reserve: Dec::zero(),
            target_inventory: Dec::zero(),
            current_inventory: Dec::zero(),
            recovery: RecoveryBin::new(sell_unused_collateral),
        })
    }

    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn price(&self) -> &Dec {
        &self.price
    }

    pub fn current_reserve(&self) -> &Dec {
        &self.current_reserve
    }

    pub fn current_inventory(&self) -> &Dec {
        &self.current_inventory
    }

    pub fn has_reserve(&self) -> bool {
        !self.current_reserve.is_zero()
    }

    pub fn has_inventory(&self) -> bool {
        !self.current_inventory.is_zero()
    }

    pub fn collateral(&self) -> &Dec {
        self.recovery.collateral()
    }

    pub fn add_collateral(&mut self, fees: Dec) {
        self.recovery.add_collateral(fees);
    }

    /// Reserve originally backing the inventory held at this tick
    pub fn respective_of_current(&self) -> Dec {
        if self.current_inventory.is_zero() {
            return Dec::zero();
        }
        &self.current_inventory / &self.price
    }

    // ========================================================================
    // Fills
    // ========================================================================

    /// Trader pays reserve units, receives inventory. Recovery runs first;
    /// the local fill then consumes `current_inventory`.
    pub fn swap_reserve_for_inventory(
        &mut self,
        qty_in: Dec,
        book: &mut Liquidity,
    ) -> CoreResult<FillOutcome> {
        let mut remainder = qty_in;
        let mut qty_out = Dec::zero();
        let mut recovered = Dec::zero();

        loop {
            if remainder.is_dust() {
                break;
            }
            let r = self
                .recovery
                .recover(&remainder, self.tick, &self.price, book)?;
            if r.inventory_out.is_dust() {
                break;
            }
            qty_out += r.inventory_out;
            remainder -= r.reserve_used;
            if remainder.is_negative() {
                remainder = Dec::zero();
            }
            recovered += r.recovered_reserve;
        }

        if remainder.is_dust() {
            return Ok(FillOutcome {
                qty_out,
                remainder_in: remainder,
                recovered_reserve: recovered,
                tick_exhausted: false,
            });
        }
        if self.current_inventory.is_zero() {
            return Ok(FillOutcome {
                qty_out,
                remainder_in: remainder,
                recovered_reserve: recovered,
                tick_exhausted: true,
            });
        }

        let needs = &remainder * &self.price;
        let headroom = &self.current_inventory - &needs;
        if headroom.is_positive() && !headroom.is_dust() {
            // partial fill, the tick survives
            self.current_inventory -= &needs;
            self.current_reserve += &remainder;
            qty_out += needs;
            Ok(FillOutcome {
                qty_out,
                remainder_in: Dec::zero(),
                recovered_reserve: recovered,
                tick_exhausted: false,
            })
        } else {
            // drain everything the tick has
            let give = mem::replace(&mut self.current_inventory, Dec::zero());
            let used = (&give / &self.price).min(remainder.clone());
            self.current_reserve += &used;
            qty_out += give;
            remainder -= used;
            if remainder.is_negative() {
                remainder = Dec::zero();
            }
            Ok(FillOutcome {
                qty_out,
                remainder_in: remainder,
                recovered_reserve: recovered,
                tick_exhausted: true,
            })
        }
    }

    /// Trader pays inventory units, receives reserve. No recovery path.
    pub fn swap_inventory_for_reserve(
        &mut self,
        qty_in: Dec,
        _book: &mut Liquidity,
    ) -> CoreResult<FillOutcome> {
        let mut remainder = qty_in;
        let mut qty_out = Dec::zero();

        if remainder.is_dust() {
            return Ok(FillOutcome {
                qty_out,
                remainder_in: remainder,
                recovered_reserve: Dec::zero(),
                tick_exhausted: false,
            });
        }
        if self.current_reserve.is_zero() {
            return Ok(FillOutcome {
                qty_out,
                remainder_in: remainder,
                recovered_reserve: Dec::zero(),
                tick_exhausted: true,
            });
        }

        let needs = &remainder / &self.price;
        let headroom = &self.current_reserve - &needs;
        if headroom.is_positive() && !headroom.is_dust() {
            self.current_reserve -= &needs;
            self.current_inventory += &remainder;
            qty_out += needs;
            Ok(FillOutcome {
                qty_out,
                remainder_in: Dec::zero(),
                recovered_reserve: Dec::zero(),
                tick_exhausted: false,
            })
        } else {
            let give = mem::replace(&mut self.current_reserve, Dec::zero());
            let used = (&give * &self.price).min(remainder.clone());
            self.current_inventory += &used;
            qty_out += give;
            remainder -= used;
            if remainder.is_negative() {
                remainder = Dec::zero();
            }
            Ok(FillOutcome {
                qty_out,
                remainder_in: remainder,
                recovered_reserve: Dec::zero(),
                tick_exhausted: true,
            })
        }
    }

    // ========================================================================
    // Cursor advancement
    // ========================================================================

    /// Step down into inventory territory. Precondition: the inventory here
    /// is spent. Residual reserve returns to the book, which keeps the
    /// reserve range pinned to the price.
    pub fn advance_down(&mut self, book: &mut Liquidity) -> CoreResult<()> {
        if !self.current_inventory.is_dust() {
            return Err(CoreError::InvariantViolation(
                "advancing past a tick that still holds inventory",
            ));
        }
        let residual = mem::replace(&mut self.current_reserve, Dec::zero());
        let next = tick_down(self.tick)?;
        self.load_empty(next);
        if let Some((qty, tick)) = book.obtain_inventory_tick(residual, next)? {
            debug_assert_eq!(tick, next);
            self.load_inventory(qty);
        }
        Ok(())
    }

    /// Step up into reserve territory. Precondition: the reserve here is
    /// spent. Accumulated inventory returns to the book as the new best
    /// inventory tick.
    pub fn advance_up(&mut self, book: &mut Liquidity) -> CoreResult<()> {
        if !self.current_reserve.is_dust() {
            return Err(CoreError::InvariantViolation(
                "advancing past a tick that still holds reserve",
            ));
        }
        let residual = mem::replace(&mut self.current_inventory, Dec::zero());
        let vacated = self.tick;
        let next = tick_up(self.tick)?;
        self.load_empty(next);
        let backing = (!residual.is_zero()).then_some(InventoryTick {
            qty: residual,
            tick: vacated,
        });
        if let Some((qty, tick)) = book.obtain_reserve_tick(backing, next)? {
            debug_assert_eq!(tick, next);
            self.load_reserve(qty);
        }
        Ok(())
    }

    fn load_empty(&mut self, tick: i32) {
        self.tick = tick;
        self.price = price_at(tick);
        self.target_reserve = Dec::zero();
        self.current_reserve = Dec::zero();
        self.target_inventory = Dec::zero();
        self.current_inventory = Dec::zero();
    }

    fn load_reserve(&mut self, qty: Dec) {
        self.target_inventory = &qty * &self.price;
        self.target_reserve = qty.clone();
        self.current_reserve = qty;
        self.current_inventory = Dec::zero();
    }

    fn load_inventory(&mut self, qty: Dec) {
        self.target_reserve = &qty / &self.price;
        self.target_inventory = qty.clone();
        self.current_inventory = qty;
        self.current_reserve = Dec::zero();
    }

    // ========================================================================
    // Deposits and withdrawals
    // ========================================================================

    /// The current tick's share of a user deposit
    pub fn deposit(&mut self, qty: Dec) {
        self.target_inventory += &qty * &self.price;
        self.target_reserve += &qty;
        self.current_reserve += qty;
    }

    /// Remove `cut` of everything here; returns (reserve, inventory,
    /// collateral) parts
    pub fn withdraw_cut(&mut self, cut: &Dec) -> (Dec, Dec, Dec) {
        let reserve_part = &self.current_reserve * cut;
        let inventory_part = &self.current_inventory * cut;
        self.current_reserve -= &reserve_part;
        self.current_inventory -= &inventory_part;
        let target_reserve_part = &self.target_reserve * cut;
        let target_inventory_part = &self.target_inventory * cut;
        self.target_reserve -= &target_reserve_part;
        self.target_inventory -= &target_inventory_part;
        let collateral_part = self.recovery.withdraw_cut(cut);
        (reserve_part, inventory_part, collateral_part)
    }
}
