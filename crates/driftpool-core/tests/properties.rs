//! Invariant properties: range distribution shapes under arbitrary
//! operations, and pool-level conservation across randomized swap streams.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use driftpool_core::current_tick::CurrentTick;
use driftpool_core::errors::CoreError;
use driftpool_core::liquidity::Liquidity;
use driftpool_core::range::{InventoryRange, ReserveRange};
use driftpool_core::tick::price_at;
use driftpool_core::{Dec, InitialReserves, Pool, Side, SwapDirection};

fn dec(s: &str) -> Dec {
    s.parse().unwrap()
}

proptest! {
    /// Reserve ranges stay uniform through best-tick consumption
    #[test]
    fn prop_reserve_range_uniform(
        left in -1000i32..1000,
        width in 1i32..400,
        qty in 1u64..1_000_000u64,
        takes in 0usize..10,
    ) {
        let mut range = ReserveRange::new(left, left + width - 1, Dec::from(qty)).unwrap();
        let takes = takes.min(width as usize - 1);
        for _ in 0..takes {
            range.take_best().unwrap();
        }
        let (best, _) = range.peek_best().unwrap();
        let (worst, _) = range.peek_worst().unwrap();
        let per = range.qty() / &Dec::from(range.width());
        prop_assert!((&best - &worst).abs().is_dust());
        prop_assert!((&best - &per).abs().is_dust());
    }

    /// Inventory ranges keep the per-tick respective reserve uniform at both
    /// boundaries
    #[test]
    fn prop_inventory_respective_uniform(
        tick in -500i32..500,
        width in 1i32..200,
        rho_int in 1u64..1000u64,
    ) {
        let rho = Dec::from(rho_int);
        let mut range = InventoryRange::new_single(tick, &rho * &price_at(tick)).unwrap();
        for t in (tick + 1)..(tick + width) {
            range.put_best(&rho * &price_at(t), t).unwrap();
        }
        let (best, best_tick) = range.peek_best().unwrap();
        let (worst, worst_tick) = range.peek_worst().unwrap();
        let best_resp = &best / &price_at(best_tick);
        let worst_resp = &worst / &price_at(worst_tick);
        let tolerance = dec("1e-30");
        prop_assert!(((&best_resp - &rho).abs() / &rho) < tolerance);
        prop_assert!(((&worst_resp - &rho).abs() / &rho) < tolerance);
    }
}

/// Deposit then withdraw with no trades in between returns exactly the
/// deposited quantity and none of the other asset
#[test]
fn deposit_withdraw_round_trip_is_exact() {
    for side in [Side::Base, Side::Quote] {
        let mut pool = Pool::new(250, 500, None, None).unwrap();
        pool.deposit(side, dec("12345")).unwrap();
        let w = pool.withdraw(side, dec("12345")).unwrap();
        let (own, other) = match side {
            Side::Base => (w.base, w.quote),
            Side::Quote => (w.quote, w.base),
        };
        assert_eq!(own, dec("12345"));
        assert!(other.is_zero());
        assert!(pool.overall_reserve().base.is_zero());
        assert!(pool.overall_reserve().quote.is_zero());
    }
}

/// Advancing a cursor while the providing side still holds liquidity is an
/// invariant violation
#[test]
fn tick_advancement_safety() {
    let mut book = Liquidity::new(None);
    let mut cur = CurrentTick::new(0, false).unwrap();
    cur.deposit(dec("5"));
    assert!(matches!(
        cur.advance_up(&mut book),
        Err(CoreError::InvariantViolation(_))
    ));

    // accumulate inventory at the tick, then try to step down through it
    cur.swap_inventory_for_reserve(Dec::one(), &mut book)
        .unwrap();
    assert!(matches!(
        cur.advance_down(&mut book),
        Err(CoreError::InvariantViolation(_))
    ));
}

/// A seeded stream of random swaps keeps the four cursors aligned, keeps
/// slippage non-negative whenever the tick moves, and never lets reserve
/// disappear: the fee side grows, and a side only shrinks by the collateral
/// its bins spent on recovery
#[test]
fn random_swap_stream_conserves_reserves() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut pool = Pool::new(
        0,
        1000,
        None,
        Some(InitialReserves {
            base: dec("1000000"),
            quote: dec("1000000"),
        }),
    )
    .unwrap();

    let tolerance = dec("1e-30");
    let mut prev_overall = pool.overall_reserve();
    let mut prev_collateral = pool.stats().collateral;

    for _ in 0..150 {
        let direction = if rng.gen_bool(0.5) {
            SwapDirection::BaseToQuote
        } else {
            SwapDirection::QuoteToBase
        };
        let qty = Dec::from(rng.gen_range(1u64..500));
        let tick_before = pool.cur_absolute_tick();

        let out = pool.swap(direction, qty).unwrap();

        // property 1: tick equality
        let digest = pool.liquidity_digest();
        for amm in &digest.amms {
            assert_eq!(amm.current_tick, pool.cur_absolute_tick());
        }

        // property 6: slippage sign on tick-moving swaps
        if pool.cur_absolute_tick() != tick_before {
            assert!(out.slippage > -tolerance.clone(), "slippage {}", out.slippage);
        }

        // property 2: per-side reserve conservation. Fees are denominated in
        // the input asset and credited to bins of that denomination.
        let overall = pool.overall_reserve();
        let collateral = pool.stats().collateral;
        let (fees_base, fees_quote) = match direction {
            SwapDirection::BaseToQuote => (out.fees_in.clone(), Dec::zero()),
            SwapDirection::QuoteToBase => (Dec::zero(), out.fees_in.clone()),
        };
        let spent_base =
            (&prev_collateral.base + &fees_base - &collateral.base).max(Dec::zero());
        let spent_quote =
            (&prev_collateral.quote + &fees_quote - &collateral.quote).max(Dec::zero());
        assert!(
            overall.base >= &prev_overall.base - &spent_base - &tolerance,
            "base reserve disappeared"
        );
        assert!(
            overall.quote >= &prev_overall.quote - &spent_quote - &tolerance,
            "quote reserve disappeared"
        );
        // property 7 at the pool boundary: bins only grow by fees
        assert!(collateral.base <= &prev_collateral.base + &fees_base + &tolerance);
        assert!(collateral.quote <= &prev_collateral.quote + &fees_quote + &tolerance);

        prev_overall = overall;
        prev_collateral = collateral;
    }
}
