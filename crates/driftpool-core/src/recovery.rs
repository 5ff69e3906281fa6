//! # Recovery Bin
//!
//! Fee collateral and the worst-tick IL repair. Collateral is denominated in
//! the owning sub-AMM's inventory asset (the input asset of the swaps that
//! funded it). During a reserve→inventory fill the bin borrows the worst
//! inventory tick from the book and closes it out at the current price: the
//! trader pays the tick's original reserve cost, the collateral covers the
//! inventory shortfall, and the tick leaves the book made whole.
//!
//! Every recovery either resolves the worst tick entirely or leaves exactly
//! one worst slice with strictly less IL; collateral never increases within
//! a swap.

use crate::decimal::Dec;
use crate::errors::{CoreError, CoreResult};
use crate::liquidity::{Borrowed, Liquidity};
use crate::range::InventoryTick;
use crate::tick::price_at;

/// One recovery step's effect on the swap in flight
#[derive(Clone, Debug, Default)]
pub struct Recovery {
    /// Inventory handed to the trader
    pub inventory_out: Dec,
    /// Input reserve consumed
    pub reserve_used: Dec,
    /// Reserve made whole again, to be re-deposited uniformly by the pool
    pub recovered_reserve: Dec,
}

impl Recovery {
    fn none() -> Self {
        Recovery::default()
    }
}

#[derive(Clone, Debug)]
pub struct RecoveryBin {
    collateral: Dec,
    /// sell leftover collateral at the current price when no worst tick
    /// exists (off by default)
    sell_unused: bool,
}

impl RecoveryBin {
    pub fn new(sell_unused: bool) -> Self {
        RecoveryBin {
            collateral: Dec::zero(),
            sell_unused,
        }
    }

    pub fn collateral(&self) -> &Dec {
        &self.collateral
    }

    pub fn add_collateral(&mut self, fees: Dec) {
        self.collateral += fees;
    }

    /// Liquidity withdrawal takes its share of the collateral; the bin holds
    /// no borrowed tick between calls, so this is a plain cut
    pub fn withdraw_cut(&mut self, cut: &Dec) -> Dec {
        let out = &self.collateral * cut;
        self.collateral -= &out;
        out
    }

    /// Attempt one IL-repair step against the swap's remaining input.
    ///
    /// `cur_price` is the fill price at `cur_tick`. Returns a zero outcome
    /// when nothing can be recovered; the caller loops until then.
    pub fn recover(
        &mut self,
        reserve_in: &Dec,
        cur_tick: i32,
        cur_price: &Dec,
        book: &mut Liquidity,
    ) -> CoreResult<Recovery> {
        if self.collateral.is_dust() || reserve_in.is_dust() {
            return Ok(Recovery::none());
        }
        let collateral = self.collateral.clone();
        let outcome = book.with_worst_inventory(|worst| {
            if worst.tick == cur_tick {
                // same-tick inventory belongs to the normal fill path
                return Ok((Borrowed::Keep(worst), (Recovery::none(), Dec::zero())));
            }
            if worst.tick > cur_tick {
                return Err(CoreError::InvariantViolation(
                    "worst inventory above the current fill price",
                ));
            }
            let p0 = price_at(worst.tick);
            let r0 = &worst.qty / &p0;
            let i1 = &r0 * cur_price;
            let shortfall = &i1 - &worst.qty;
            if !shortfall.is_positive() {
                return Err(CoreError::InvariantViolation(
                    "recovery computed no inventory shortfall",
                ));
            }
            let share = Dec::one()
                .min(&collateral / &shortfall)
                .min(reserve_in / &r0);
            let debit = (&shortfall * &share).min(collateral.clone());
            let reserve_used = (&r0 * &share).min(reserve_in.clone());
            let inventory_out = &(&worst.qty * &share) + &debit;
            let recovery = Recovery {
                inventory_out,
                reserve_used: reserve_used.clone(),
                recovered_reserve: reserve_used,
            };
            if share == Dec::one() {
                log::debug!("recovery resolved worst tick {}", worst.tick);
                Ok((Borrowed::Resolved, (recovery, debit)))
            } else {
                let leftover = &worst.qty - &(&worst.qty * &share);
                log::debug!(
                    "partial recovery at worst tick {} (share {})",
                    worst.tick,
                    share.to_f64()
                );
                Ok((
                    Borrowed::Keep(InventoryTick {
                        qty: leftover,
                        tick: worst.tick,
                    }),
                    (recovery, debit),
                ))
            }
        })?;
        match outcome {
            Some((recovery, debit)) => {
                self.collateral -= debit;
                if self.collateral.is_dust() || self.collateral.is_negative() {
                    self.collateral = Dec::zero();
                }
                Ok(recovery)
            }
            None => Ok(self.sell_unused_collateral(reserve_in, cur_price)),
        }
    }

    /// No worst tick exists: optionally convert collateral back to reserve at
    /// the current price
    fn sell_unused_collateral(&mut self, reserve_in: &Dec, cur_price: &Dec) -> Recovery {
        if !self.sell_unused {
            return Recovery::none();
        }
        let cap = reserve_in * cur_price;
        let sold = self.collateral.clone().min(cap);
        if sold.is_dust() {
            return Recovery::none();
        }
        let reserve_used = (&sold / cur_price).min(reserve_in.clone());
        self.collateral -= &sold;
        if self.collateral.is_dust() {
            self.collateral = Dec::zero();
        }
        log::debug!("sold {} unused collateral", sold.to_f64());
        Recovery {
            inventory_out: sold,
            reserve_used: reserve_used.clone(),
            recovered_reserve: reserve_used,
        }
    }
}
