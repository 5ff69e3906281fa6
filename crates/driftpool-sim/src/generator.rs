//! Market-order generator.
//!
//! Trades are sampled around a pivot tick that random-walks with the
//! configured volatility; when the pool price is away from the pivot, the
//! flow leans toward closing the gap. Sizes jitter around the per-trade mean
//! implied by the daily volume target.

use driftpool_core::{Dec, SwapDirection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One generated market swap
#[derive(Clone, Debug)]
pub struct Trade {
    pub direction: SwapDirection,
    pub qty_in: Dec,
}

pub struct TradeGenerator {
    rng: StdRng,
    pivot: f64,
    /// per-day relative price volatility
    volatility: f64,
    mean_size: f64,
    trades_per_day: u32,
}

impl TradeGenerator {
    pub fn new(
        seed: u64,
        start_tick: i32,
        volatility: f64,
        daily_volume: f64,
        trades_per_day: u32,
    ) -> Self {
        TradeGenerator {
            rng: StdRng::seed_from_u64(seed),
            pivot: start_tick as f64,
            volatility,
            mean_size: daily_volume / trades_per_day as f64,
            trades_per_day,
        }
    }

    pub fn pivot_tick(&self) -> f64 {
        self.pivot
    }

    /// Sample the next trade given the pool's current tick
    pub fn next_trade(&mut self, cur_tick: i32) -> Trade {
        // a volatility of v per day corresponds to ~v/1e-4 ticks of drift;
        // spread it over the day's trades
        let step = self.volatility / 1e-4 / (self.trades_per_day as f64).sqrt();
        self.pivot += (self.rng.gen::<f64>() * 2.0 - 1.0) * step;

        // lean toward the pivot: above it, sell pressure wins
        let toward_pivot = if (cur_tick as f64) > self.pivot {
            SwapDirection::BaseToQuote
        } else {
            SwapDirection::QuoteToBase
        };
        let direction = if self.rng.gen_bool(0.7) {
            toward_pivot
        } else {
            match toward_pivot {
                SwapDirection::BaseToQuote => SwapDirection::QuoteToBase,
                SwapDirection::QuoteToBase => SwapDirection::BaseToQuote,
            }
        };

        let size = self.mean_size * (0.25 + 1.5 * self.rng.gen::<f64>());
        let qty_in: Dec = format!("{:.6}", size)
            .parse()
            .unwrap_or_else(|_| Dec::one());
        Trade { direction, qty_in }
    }
}
