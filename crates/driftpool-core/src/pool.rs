//! # Pool
//!
//! The four-way orchestrator. A pool is `{stable, drifting} × {base, quote}`
//! sub-AMMs sharing one absolute tick. A swap skims fees into the
//! outbound-side recovery bins, then routes the input across all four
//! sub-AMMs in a fixed order; when a full round makes no progress the pool
//! advances every cursor one step in lock-step and checks that the four
//! absolute ticks still agree.
//!
//! One swap occupies the pool from start to completion; there are no
//! suspension points. Errors are fatal to the operation and leave the pool
//! inconsistent; callers needing try-swap semantics clone first and adopt
//! the clone on success.

use serde::{Deserialize, Serialize};

use crate::amm::{Amm, AmmKind, Fill};
use crate::constants::{
    DEFAULT_MAX_FEE_STR, DEFAULT_MIN_FEE_STR, DEFAULT_STABLE_SHARE_STR, DEFAULT_TICK_SPAN,
    IL_FEE_MIDPOINT_STR,
};
use crate::decimal::Dec;
use crate::errors::{CoreError, CoreResult};
use crate::tick::{checked_step, checked_tick, price_at, Side};

// ============================================================================
// Configuration and result types
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Share of deposits and fees routed to the stable sub-AMMs
    pub stable_share: Dec,
    pub min_fee: Dec,
    pub max_fee: Dec,
    /// Width of the drifting sub-AMMs' reserve windows, in ticks
    pub tick_span: i32,
    /// Let a bin sell leftover collateral at the current price when it has
    /// no worst tick to repair
    pub sell_unused_collateral: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            stable_share: DEFAULT_STABLE_SHARE_STR.parse().expect("stable share literal"),
            min_fee: DEFAULT_MIN_FEE_STR.parse().expect("min fee literal"),
            max_fee: DEFAULT_MAX_FEE_STR.parse().expect("max fee literal"),
            tick_span: DEFAULT_TICK_SPAN,
            sell_unused_collateral: false,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.stable_share.is_negative() || self.stable_share > Dec::one() {
            return Err(CoreError::InvariantViolation(
                "stable share outside [0, 1]",
            ));
        }
        if self.min_fee.is_negative() || self.max_fee < self.min_fee {
            return Err(CoreError::InvariantViolation("fee bounds inverted"));
        }
        if self.tick_span < 1 {
            return Err(CoreError::InvariantViolation("tick span must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    BaseToQuote,
    QuoteToBase,
}

impl SwapDirection {
    pub fn input_side(self) -> Side {
        match self {
            SwapDirection::BaseToQuote => Side::Base,
            SwapDirection::QuoteToBase => Side::Quote,
        }
    }

    pub fn output_side(self) -> Side {
        self.input_side().opposite()
    }
}

/// Starting balances for `Pool::new`
#[derive(Clone, Debug)]
pub struct InitialReserves {
    pub base: Dec,
    pub quote: Dec,
}

/// A per-asset pair, used for overall reserve and withdrawals
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Reserves {
    pub base: Dec,
    pub quote: Dec,
}

#[derive(Clone, Debug)]
pub struct SwapOutcome {
    pub qty_out: Dec,
    pub fee_factor: Dec,
    pub fees_in: Dec,
    /// `1 − qty_out/expected_out` against the pre-swap price
    pub slippage: Dec,
}

// ============================================================================
// Digest and stats
// ============================================================================

/// Point-in-time snapshot for reporting
#[derive(Clone, Debug, Serialize)]
pub struct PoolStats {
    pub tick: i32,
    pub fee_factor: Dec,
    pub il_base: Dec,
    pub il_quote: Dec,
    pub overall: Reserves,
    pub deposited: Reserves,
    /// collateral held per asset (a side's bins hold the opposite asset)
    pub collateral: Reserves,
}

/// Data-only view of every range for an external renderer
#[derive(Clone, Debug, Serialize)]
pub struct LiquidityDigest {
    pub tick: i32,
    pub amms: Vec<AmmDigest>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AmmDigest {
    pub side: Side,
    pub kind: AmmKind,
    pub reserve: Option<RangeDigest>,
    pub inventory: Vec<RangeDigest>,
    pub current_tick: i32,
    pub current_reserve: Dec,
    pub current_inventory: Dec,
    pub collateral: Dec,
}

/// A range in absolute tick coordinates, `from_tick <= to_tick`
#[derive(Clone, Debug, Serialize)]
pub struct RangeDigest {
    pub from_tick: i32,
    pub to_tick: i32,
    pub qty: Dec,
}

impl RangeDigest {
    fn new(side: Side, bounds: (i32, i32), qty: Dec) -> Self {
        let a = side.to_absolute(bounds.0);
        let b = side.to_absolute(bounds.1);
        RangeDigest {
            from_tick: a.min(b),
            to_tick: a.max(b),
            qty,
        }
    }
}

// ============================================================================
// Pool
// ============================================================================

#[derive(Clone, Debug)]
pub struct Pool {
    stable_base: Amm,
    drifting_base: Amm,
    stable_quote: Amm,
    drifting_quote: Amm,
    /// shared absolute tick; every sub-AMM cursor maps to this
    cur_tick: i32,
    config: PoolConfig,
}

impl Pool {
    pub fn new(
        cur_tick: i32,
        tick_span: i32,
        config: Option<PoolConfig>,
        initial_reserves: Option<InitialReserves>,
    ) -> CoreResult<Pool> {
        let mut config = config.unwrap_or_default();
        config.tick_span = tick_span;
        config.validate()?;
        checked_tick(cur_tick as i64)?;
        let sell = config.sell_unused_collateral;
        let mut pool = Pool {
            stable_base: Amm::new(Side::Base, AmmKind::Stable, cur_tick, tick_span, sell)?,
            drifting_base: Amm::new(Side::Base, AmmKind::Drifting, cur_tick, tick_span, sell)?,
            stable_quote: Amm::new(Side::Quote, AmmKind::Stable, cur_tick, tick_span, sell)?,
            drifting_quote: Amm::new(Side::Quote, AmmKind::Drifting, cur_tick, tick_span, sell)?,
            cur_tick,
            config,
        };
        if let Some(init) = initial_reserves {
            pool.deposit(Side::Base, init.base)?;
            pool.deposit(Side::Quote, init.quote)?;
        }
        Ok(pool)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn cur_absolute_tick(&self) -> i32 {
        self.cur_tick
    }

    fn amms(&self) -> [&Amm; 4] {
        [
            &self.stable_base,
            &self.drifting_base,
            &self.stable_quote,
            &self.drifting_quote,
        ]
    }

    fn amms_mut(&mut self) -> [&mut Amm; 4] {
        [
            &mut self.stable_base,
            &mut self.drifting_base,
            &mut self.stable_quote,
            &mut self.drifting_quote,
        ]
    }

    // ========================================================================
    // Deposits and withdrawals
    // ========================================================================

    pub fn deposit(&mut self, side: Side, qty: Dec) -> CoreResult<()> {
        let to_stable = &qty * &self.config.stable_share;
        let to_drifting = &qty - &to_stable;
        let (stable, drifting) = self.side_amms_mut(side);
        stable.deposit(to_stable)?;
        drifting.deposit(to_drifting)?;
        Ok(())
    }

    /// Withdraw against the deposited-reserve accounting; returns what
    /// actually came out per asset
    pub fn withdraw(&mut self, side: Side, deposited_qty: Dec) -> CoreResult<Reserves> {
        let from_stable = &deposited_qty * &self.config.stable_share;
        let from_drifting = &deposited_qty - &from_stable;
        let (stable, drifting) = self.side_amms_mut(side);
        let a = stable.withdraw(from_stable)?;
        let b = drifting.withdraw(from_drifting)?;
        let reserve = a.reserve + b.reserve;
        let inventory = a.inventory + b.inventory;
        Ok(match side {
            Side::Base => Reserves {
                base: reserve,
                quote: inventory,
            },
            Side::Quote => Reserves {
                base: inventory,
                quote: reserve,
            },
        })
    }

    fn side_amms_mut(&mut self, side: Side) -> (&mut Amm, &mut Amm) {
        match side {
            Side::Base => (&mut self.stable_base, &mut self.drifting_base),
            Side::Quote => (&mut self.stable_quote, &mut self.drifting_quote),
        }
    }

    // ========================================================================
    // Swap
    // ========================================================================

    pub fn swap(&mut self, direction: SwapDirection, qty_in: Dec) -> CoreResult<SwapOutcome> {
        if qty_in.is_negative() {
            return Err(CoreError::InvariantViolation("negative swap input"));
        }
        let fee_factor = self.fee_factor();
        if qty_in.is_zero() {
            return Ok(SwapOutcome {
                qty_out: Dec::zero(),
                fee_factor,
                fees_in: Dec::zero(),
                slippage: Dec::zero(),
            });
        }

        let fees = &qty_in * &fee_factor;
        let net_in = &qty_in - &fees;
        self.check_price_impact(direction, &net_in)?;

        let input_side = direction.input_side();
        let price_before = price_at(input_side.to_oriented(self.cur_tick));
        log::debug!(
            "swap {:?}: in={} fee_factor={}",
            direction,
            qty_in.to_f64(),
            fee_factor.to_f64()
        );

        // fees fund the outbound side's bins, whose collateral asset is
        // exactly the input asset
        let to_stable = &fees * &self.config.stable_share;
        let to_drifting = &fees - &to_stable;
        {
            let (stable_out, drifting_out) = self.side_amms_mut(direction.output_side());
            stable_out.add_fee_collateral(to_stable);
            drifting_out.add_fee_collateral(to_drifting);
        }

        let mut remaining = net_in.clone();
        let mut qty_out = Dec::zero();
        let mut recovered = [Dec::zero(), Dec::zero(), Dec::zero(), Dec::zero()];

        loop {
            if remaining.is_dust() {
                break;
            }
            let mut consumed_any = false;
            {
                let amms = self.amms_mut();
                for (amm, rec) in amms.into_iter().zip(recovered.iter_mut()) {
                    if remaining.is_dust() {
                        break;
                    }
                    let fill = if amm.side() == input_side {
                        Fill::ReserveForInventory
                    } else {
                        Fill::InventoryForReserve
                    };
                    let outcome = amm.swap(fill, remaining.clone())?;
                    if outcome.remainder_in != remaining {
                        consumed_any = true;
                    }
                    remaining = outcome.remainder_in;
                    qty_out += outcome.qty_out;
                    *rec += outcome.recovered_reserve;
                }
                // recovered reserve re-enters each book uniformly at the end
                // of the round
                for (amm, rec) in self.amms_mut().into_iter().zip(recovered.iter_mut()) {
                    let qty = std::mem::replace(rec, Dec::zero());
                    amm.deposit_recovered(qty)?;
                }
            }
            if remaining.is_dust() {
                break;
            }
            if !consumed_any {
                self.advance_all(direction)?;
            }
        }

        self.retarget_drift()?;
        self.assert_aligned()?;

        let expected = &net_in * &price_before;
        let slippage = if expected.is_zero() {
            Dec::zero()
        } else {
            Dec::one() - &qty_out / &expected
        };
        log::debug!(
            "swap done: out={} tick={} slippage={}",
            qty_out.to_f64(),
            self.cur_tick,
            slippage.to_f64()
        );
        Ok(SwapOutcome {
            qty_out,
            fee_factor,
            fees_in: fees,
            slippage,
        })
    }

    /// Dry-run a swap against a snapshot, leaving the pool untouched.
    /// Surfaces exactly the errors the real swap would, including
    /// [`CoreError::PriceImpactTooLarge`].
    pub fn estimate_swap(
        &self,
        direction: SwapDirection,
        qty_in: Dec,
    ) -> CoreResult<SwapOutcome> {
        let mut scratch = self.clone();
        scratch.swap(direction, qty_in)
    }

    /// Move every cursor one step. The input-side sub-AMMs are consuming
    /// inventory and step down; the output side is consuming reserve and
    /// steps up. In absolute terms all four move together.
    fn advance_all(&mut self, direction: SwapDirection) -> CoreResult<()> {
        match direction {
            SwapDirection::BaseToQuote => {
                self.stable_base.advance_down()?;
                self.drifting_base.advance_down()?;
                self.stable_quote.advance_up()?;
                self.drifting_quote.advance_up()?;
                self.cur_tick = checked_step(self.cur_tick, -1)?;
            }
            SwapDirection::QuoteToBase => {
                self.stable_base.advance_up()?;
                self.drifting_base.advance_up()?;
                self.stable_quote.advance_down()?;
                self.drifting_quote.advance_down()?;
                self.cur_tick = checked_step(self.cur_tick, 1)?;
            }
        }
        log::trace!("advanced to tick {}", self.cur_tick);
        self.assert_aligned()
    }

    fn assert_aligned(&self) -> CoreResult<()> {
        for amm in self.amms() {
            if amm.absolute_tick() != self.cur_tick {
                return Err(CoreError::InvariantViolation(
                    "sub-AMM tick cursors diverged",
                ));
            }
        }
        Ok(())
    }

    /// Conservative pre-swap estimate: the output side must hold enough, in
    /// its own asset, to cover the best-case output
    fn check_price_impact(&self, direction: SwapDirection, net_in: &Dec) -> CoreResult<()> {
        let out_side = direction.output_side();
        let expected = net_in * &price_at(direction.input_side().to_oriented(self.cur_tick));
        let mut capacity = Dec::zero();
        for amm in self.amms() {
            if amm.side() == out_side {
                capacity += amm.reserve_total();
            } else {
                // the input side's inventory and collateral are denominated
                // in the output asset
                capacity += amm.inventory_total();
                capacity += amm.collateral();
            }
        }
        if expected > capacity {
            return Err(CoreError::PriceImpactTooLarge);
        }
        Ok(())
    }

    /// Keep each drifting window aligned with the opposite side's worst
    /// inventory
    fn retarget_drift(&mut self) -> CoreResult<()> {
        let quote_worst = match (
            self.stable_quote.worst_inventory_abs(),
            self.drifting_quote.worst_inventory_abs(),
        ) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let base_worst = match (
            self.stable_base.worst_inventory_abs(),
            self.drifting_base.worst_inventory_abs(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(target) = quote_worst {
            self.drifting_base.drift(target)?;
        }
        if let Some(target) = base_worst {
            self.drifting_quote.drift(target)?;
        }
        Ok(())
    }

    // ========================================================================
    // Fees and read-only views
    // ========================================================================

    /// Blend of the IL term and the drifting-window width term, both clamped
    /// to `[min_fee, min_fee + max_fee]`
    pub fn fee_factor(&self) -> Dec {
        let cfg = &self.config;
        let midpoint: Dec = IL_FEE_MIDPOINT_STR.parse().expect("fee midpoint literal");
        let il = self.il();
        let il_term = &cfg.min_fee + &(&cfg.max_fee * &(il.min(midpoint.clone()) / &midpoint));

        let widths = Dec::from(self.drifting_base.liquidity().reserve_width())
            + Dec::from(self.drifting_quote.liquidity().reserve_width());
        let ratio = (widths / &Dec::from(2 * cfg.tick_span)).min(Dec::one());
        let width_term = &cfg.min_fee + &(&cfg.max_fee * &ratio);

        (il_term + width_term) / Dec::from(2u32)
    }

    /// Worst of the two sides' aggregate impermanent loss
    pub fn il(&self) -> Dec {
        let base = self.side_il(Side::Base);
        let quote = self.side_il(Side::Quote);
        base.max(quote)
    }

    fn side_il(&self, side: Side) -> Dec {
        let (stable, drifting) = match side {
            Side::Base => (&self.stable_base, &self.drifting_base),
            Side::Quote => (&self.stable_quote, &self.drifting_quote),
        };
        let respective =
            stable.respective_reserve_total() + drifting.respective_reserve_total();
        if respective.is_dust() {
            return Dec::zero();
        }
        let price = stable.current().price();
        let actual = (stable.inventory_total() + drifting.inventory_total()) / price;
        (Dec::one() - actual / respective).max(Dec::zero())
    }

    /// Actual reserve plus the respective reserve of every tick, plus the
    /// bins, per asset. Non-decreasing across swaps.
    pub fn overall_reserve(&self) -> Reserves {
        let mut base = Dec::zero();
        let mut quote = Dec::zero();
        for amm in self.amms() {
            let actual = amm.reserve_total();
            let respective = amm.respective_reserve_total();
            // collateral is held in the opposite asset
            let collateral = amm.collateral();
            match amm.side() {
                Side::Base => {
                    base += actual + respective;
                    quote += collateral;
                }
                Side::Quote => {
                    quote += actual + respective;
                    base += collateral;
                }
            }
        }
        Reserves { base, quote }
    }

    pub fn stats(&self) -> PoolStats {
        let collateral_quote =
            self.stable_base.collateral() + self.drifting_base.collateral();
        let collateral_base =
            self.stable_quote.collateral() + self.drifting_quote.collateral();
        PoolStats {
            tick: self.cur_tick,
            fee_factor: self.fee_factor(),
            il_base: self.side_il(Side::Base),
            il_quote: self.side_il(Side::Quote),
            overall: self.overall_reserve(),
            deposited: Reserves {
                base: self.stable_base.deposited_reserve()
                    + self.drifting_base.deposited_reserve(),
                quote: self.stable_quote.deposited_reserve()
                    + self.drifting_quote.deposited_reserve(),
            },
            collateral: Reserves {
                base: collateral_base,
                quote: collateral_quote,
            },
        }
    }

    pub fn liquidity_digest(&self) -> LiquidityDigest {
        let amms = self
            .amms()
            .into_iter()
            .map(|amm| {
                let side = amm.side();
                let book = amm.liquidity();
                AmmDigest {
                    side,
                    kind: amm.kind(),
                    reserve: book
                        .reserve_bounds()
                        .map(|b| RangeDigest::new(side, b, book.reserve_qty())),
                    inventory: book
                        .inventory_ranges()
                        .map(|r| RangeDigest::new(side, r.bounds(), r.qty().clone()))
                        .collect(),
                    current_tick: amm.absolute_tick(),
                    current_reserve: amm.current().current_reserve().clone(),
                    current_inventory: amm.current().current_inventory().clone(),
                    collateral: amm.collateral(),
                }
            })
            .collect();
        LiquidityDigest {
            tick: self.cur_tick,
            amms,
        }
    }
}
