//! # Sub-AMM
//!
//! Binds one liquidity book to one current tick and keeps the virtual
//! deposited-reserve accounting. Four of these, `{stable, drifting} ×
//! {base, quote}`, make a pool.
//!
//! A stable sub-AMM's reserve spans the rest of the tick domain; a drifting
//! sub-AMM's reserve is a bounded window that the pool retargets toward the
//! opposite side's worst inventory after every swap.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_TICK;
use crate::current_tick::{CurrentTick, FillOutcome};
use crate::decimal::Dec;
use crate::errors::{CoreError, CoreResult};
use crate::liquidity::Liquidity;
use crate::tick::{checked_step, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmmKind {
    Stable,
    Drifting,
}

/// Fill direction from the sub-AMM's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fill {
    /// Trader pays reserve units, receives inventory
    ReserveForInventory,
    /// Trader pays inventory units, receives reserve
    InventoryForReserve,
}

/// What a withdrawal hands back, in the sub-AMM's own denominations
#[derive(Clone, Debug, Default)]
pub struct AmmWithdrawal {
    pub reserve: Dec,
    pub inventory: Dec,
}

#[derive(Clone, Debug)]
pub struct Amm {
    side: Side,
    kind: AmmKind,
    tick_span: i32,
    liquidity: Liquidity,
    current: CurrentTick,
    deposited_reserve: Dec,
}

impl Amm {
    pub fn new(
        side: Side,
        kind: AmmKind,
        absolute_tick: i32,
        tick_span: i32,
        sell_unused_collateral: bool,
    ) -> CoreResult<Self> {
        if tick_span < 1 {
            return Err(CoreError::InvariantViolation("tick span must be positive"));
        }
        let oriented = side.to_oriented(absolute_tick);
        let drift_span = match kind {
            AmmKind::Stable => None,
            AmmKind::Drifting => Some(tick_span),
        };
        Ok(Amm {
            side,
            kind,
            tick_span,
            liquidity: Liquidity::new(drift_span),
            current: CurrentTick::new(oriented, sell_unused_collateral)?,
            deposited_reserve: Dec::zero(),
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> AmmKind {
        self.kind
    }

    pub fn absolute_tick(&self) -> i32 {
        self.side.to_absolute(self.current.tick())
    }

    pub fn liquidity(&self) -> &Liquidity {
        &self.liquidity
    }

    pub fn current(&self) -> &CurrentTick {
        &self.current
    }

    pub fn deposited_reserve(&self) -> &Dec {
        &self.deposited_reserve
    }

    // ========================================================================
    // Deposits and withdrawals
    // ========================================================================

    /// Deposit reserve. The range gets `width/(width+1)` of it uniformly and
    /// the current tick one tick's share, so the active price level is funded
    /// immediately.
    pub fn deposit(&mut self, qty: Dec) -> CoreResult<()> {
        if qty.is_zero() {
            return Ok(());
        }
        if qty.is_negative() {
            return Err(CoreError::InvariantViolation("negative deposit"));
        }
        self.ensure_reserve_window()?;
        let width = self.liquidity.reserve_width();
        let to_range = &qty * &Dec::from(width) / &Dec::from(width + 1);
        let to_current = &qty - &to_range;
        self.liquidity.deposit_reserve(to_range)?;
        self.current.deposit(to_current);
        self.deposited_reserve += qty;
        self.liquidity.notify_reserve_changed();
        Ok(())
    }

    fn ensure_reserve_window(&mut self) -> CoreResult<()> {
        if self.liquidity.has_reserve() {
            return Ok(());
        }
        let left = checked_step(self.current.tick(), 1)?;
        let right = match self.kind {
            AmmKind::Stable => MAX_TICK,
            AmmKind::Drifting => checked_step(self.current.tick(), self.tick_span)?,
        };
        self.liquidity.init_reserve(left, right)
    }

    /// Withdraw a share of the deposited reserve. Reserve and the current
    /// tick give up their cut directly; inventory drains from the worst end,
    /// so early exiters absorb the highest IL.
    pub fn withdraw(&mut self, deposited_cut: Dec) -> CoreResult<AmmWithdrawal> {
        if deposited_cut.is_zero() {
            return Ok(AmmWithdrawal::default());
        }
        if deposited_cut.is_negative()
            || self.deposited_reserve.is_zero()
            || deposited_cut > self.deposited_reserve
        {
            return Err(CoreError::InvariantViolation(
                "withdrawal exceeds deposited reserve",
            ));
        }
        let cut = &deposited_cut / &self.deposited_reserve;
        let from_range = self.liquidity.withdraw_reserve_cut(&cut);
        let (from_tick_reserve, from_tick_inventory, collateral) =
            self.current.withdraw_cut(&cut);
        let target_respective = self.liquidity.respective_reserve() * &cut;
        let drained = if target_respective.is_dust() {
            Dec::zero()
        } else {
            self.liquidity.drain_worst_inventory(target_respective)?
        };
        self.deposited_reserve -= deposited_cut;
        self.liquidity.notify_reserve_changed();
        Ok(AmmWithdrawal {
            reserve: from_range + from_tick_reserve,
            inventory: from_tick_inventory + collateral + drained,
        })
    }

    /// Recovered reserve returns to the uniform range at the end of a
    /// routing round
    pub fn deposit_recovered(&mut self, qty: Dec) -> CoreResult<()> {
        if qty.is_dust() {
            return Ok(());
        }
        if !self.liquidity.has_reserve() {
            let tick = checked_step(self.current.tick(), 1)?;
            self.liquidity.init_reserve(tick, tick)?;
        }
        self.liquidity.deposit_reserve(qty)?;
        self.liquidity.notify_reserve_changed();
        Ok(())
    }

    // ========================================================================
    // Swaps and cursor motion
    // ========================================================================

    pub fn swap(&mut self, fill: Fill, qty_in: Dec) -> CoreResult<FillOutcome> {
        let Amm {
            current, liquidity, ..
        } = self;
        match fill {
            Fill::ReserveForInventory => current.swap_reserve_for_inventory(qty_in, liquidity),
            Fill::InventoryForReserve => current.swap_inventory_for_reserve(qty_in, liquidity),
        }
    }

    pub fn advance_up(&mut self) -> CoreResult<()> {
        let Amm {
            current, liquidity, ..
        } = self;
        current.advance_up(liquidity)
    }

    pub fn advance_down(&mut self) -> CoreResult<()> {
        let Amm {
            current, liquidity, ..
        } = self;
        current.advance_down(liquidity)
    }

    /// Retarget the drifting reserve window's far boundary to the opposite
    /// side's worst inventory tick (given in absolute coordinates)
    pub fn drift(&mut self, target_absolute: i32) -> CoreResult<bool> {
        if self.kind != AmmKind::Drifting {
            return Ok(false);
        }
        let target = self.side.to_oriented(target_absolute);
        let moved = self.liquidity.drift_worst(target)?;
        if moved {
            log::debug!(
                "{:?} drifting window retargeted to absolute tick {}",
                self.side,
                target_absolute
            );
        }
        Ok(moved)
    }

    pub fn add_fee_collateral(&mut self, fees: Dec) {
        if !fees.is_zero() {
            self.current.add_collateral(fees);
        }
    }

    // ========================================================================
    // Accounting
    // ========================================================================

    /// Actual reserve held, in the sub-AMM's reserve asset
    pub fn reserve_total(&self) -> Dec {
        self.liquidity.reserve_qty() + self.current.current_reserve()
    }

    /// Inventory held, in the opposite asset
    pub fn inventory_total(&self) -> Dec {
        self.liquidity.total_inventory() + self.current.current_inventory()
    }

    /// Reserve originally spent for all held inventory
    pub fn respective_reserve_total(&self) -> Dec {
        self.liquidity.respective_reserve() + self.current.respective_of_current()
    }

    /// Collateral, in the opposite asset
    pub fn collateral(&self) -> Dec {
        self.current.collateral().clone()
    }

    /// Impermanent loss on held inventory: `1 − actual/respective`, clamped
    /// at zero, zero when no inventory is held
    pub fn il(&self) -> Dec {
        let respective = self.respective_reserve_total();
        if respective.is_dust() {
            return Dec::zero();
        }
        let actual = self.inventory_total() / self.current.price();
        (Dec::one() - actual / respective).max(Dec::zero())
    }

    /// Absolute index of the worst inventory tick in the book, if any
    pub fn worst_inventory_abs(&self) -> Option<i32> {
        self.liquidity
            .worst_inventory_tick()
            .map(|t| self.side.to_absolute(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_TICK;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_stable_deposit_spans_domain() {
        let mut amm = Amm::new(Side::Base, AmmKind::Stable, 0, 1000, false).unwrap();
        amm.deposit(dec("1000")).unwrap();
        assert_eq!(amm.liquidity().reserve_bounds(), Some((1, MAX_TICK)));
        // total reserve is intact across the range/current split
        assert!((amm.reserve_total() - dec("1000")).abs().is_dust());
        assert_eq!(*amm.deposited_reserve(), dec("1000"));
    }

    #[test]
    fn test_drifting_deposit_is_windowed() {
        let mut amm = Amm::new(Side::Base, AmmKind::Drifting, 100, 50, false).unwrap();
        amm.deposit(dec("510")).unwrap();
        assert_eq!(amm.liquidity().reserve_bounds(), Some((101, 150)));
        // width/(width+1) of the deposit lands in the range
        assert_eq!(amm.liquidity().reserve_qty(), dec("500"));
        assert_eq!(*amm.current().current_reserve(), dec("10"));
    }

    #[test]
    fn test_quote_side_orients_window() {
        let mut amm = Amm::new(Side::Quote, AmmKind::Drifting, 100, 50, false).unwrap();
        amm.deposit(dec("100")).unwrap();
        // oriented cursor is -100, the window sits above it
        assert_eq!(amm.liquidity().reserve_bounds(), Some((-99, -50)));
        assert_eq!(amm.absolute_tick(), 100);
    }

    #[test]
    fn test_deposit_withdraw_round_trip() {
        let mut amm = Amm::new(Side::Base, AmmKind::Stable, 0, 1000, false).unwrap();
        amm.deposit(dec("1000")).unwrap();
        let w = amm.withdraw(dec("1000")).unwrap();
        assert_eq!(w.reserve, dec("1000"));
        assert!(w.inventory.is_zero());
        assert!(amm.deposited_reserve().is_zero());
        assert!(amm.reserve_total().is_zero());
    }

    #[test]
    fn test_withdraw_over_deposit_fails() {
        let mut amm = Amm::new(Side::Base, AmmKind::Stable, 0, 1000, false).unwrap();
        amm.deposit(dec("100")).unwrap();
        assert!(matches!(
            amm.withdraw(dec("101")),
            Err(CoreError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_swap_consumes_reserve_upward() {
        let mut amm = Amm::new(Side::Base, AmmKind::Drifting, 100, 10, false).unwrap();
        amm.deposit(dec("110")).unwrap();
        // current tick holds one share; the trader buys through it
        let out = amm.swap(Fill::InventoryForReserve, dec("1000")).unwrap();
        assert!(out.tick_exhausted);
        assert!(out.qty_out.is_positive());
        amm.advance_up().unwrap();
        assert_eq!(amm.absolute_tick(), 101);
        // the vacated tick's inventory is now the book's best
        assert!(amm.liquidity().total_inventory().is_positive());
    }

    #[test]
    fn test_il_zero_without_inventory() {
        let mut amm = Amm::new(Side::Base, AmmKind::Stable, 0, 1000, false).unwrap();
        amm.deposit(dec("100")).unwrap();
        assert!(amm.il().is_zero());
    }

    #[test]
    fn test_il_grows_as_price_leaves_inventory_behind() {
        let mut amm = Amm::new(Side::Base, AmmKind::Drifting, 0, 10, false).unwrap();
        amm.deposit(dec("110")).unwrap();
        // sweep upward through several ticks, accumulating inventory
        for _ in 0..5 {
            let out = amm.swap(Fill::InventoryForReserve, dec("1000")).unwrap();
            assert!(out.tick_exhausted);
            amm.advance_up().unwrap();
        }
        let il = amm.il();
        assert!(il.is_positive());
        assert!(il < Dec::one());
    }

    #[test]
    fn test_drift_only_for_drifting() {
        let mut stable = Amm::new(Side::Base, AmmKind::Stable, 0, 1000, false).unwrap();
        stable.deposit(dec("100")).unwrap();
        assert!(!stable.drift(500).unwrap());

        let mut drifting = Amm::new(Side::Base, AmmKind::Drifting, 0, 100, false).unwrap();
        drifting.deposit(dec("100")).unwrap();
        assert!(drifting.drift(500).unwrap());
        assert_eq!(drifting.liquidity().reserve_bounds(), Some((1, 500)));
    }

    #[test]
    fn test_staged_withdrawals_empty_the_amm() {
        let mut amm = Amm::new(Side::Base, AmmKind::Drifting, 0, 10, false).unwrap();
        amm.deposit(dec("110")).unwrap();
        // trade through a couple of ticks so inventory exists
        for _ in 0..2 {
            amm.swap(Fill::InventoryForReserve, dec("1000")).unwrap();
            amm.advance_up().unwrap();
        }
        let first = amm.withdraw(dec("55")).unwrap();
        assert!(first.reserve.is_positive());
        assert!(first.inventory.is_positive());
        assert_eq!(*amm.deposited_reserve(), dec("55"));

        let second = amm.withdraw(dec("55")).unwrap();
        assert!(amm.deposited_reserve().is_zero());
        assert!(amm.reserve_total().is_dust());
        assert!(amm.inventory_total().is_dust());
        // both rounds together returned everything held
        let total_reserve = &first.reserve + &second.reserve;
        let total_inventory = &first.inventory + &second.inventory;
        assert!(total_reserve.is_positive());
        assert!(total_inventory.is_positive());
    }

    #[test]
    fn test_deposit_recovered_creates_window_if_needed() {
        let mut amm = Amm::new(Side::Base, AmmKind::Drifting, 0, 10, false).unwrap();
        amm.deposit_recovered(dec("5")).unwrap();
        assert_eq!(amm.liquidity().reserve_bounds(), Some((1, 1)));
        assert_eq!(amm.liquidity().reserve_qty(), dec("5"));
    }
}
