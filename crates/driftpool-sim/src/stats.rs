//! Run statistics accumulated over a simulation.

use std::fmt;

use driftpool_core::{Dec, PoolStats, SwapDirection, SwapOutcome};
use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize)]
pub struct SimStats {
    pub trades: u64,
    pub rejected: u64,
    pub volume_base_in: f64,
    pub volume_quote_in: f64,
    pub fees_base: f64,
    pub fees_quote: f64,
    pub mean_slippage: f64,
    pub min_tick: i32,
    pub max_tick: i32,
    /// pool snapshot at the end of the run
    pub final_pool: Option<PoolStats>,
}

impl SimStats {
    pub fn new(start_tick: i32) -> Self {
        SimStats {
            min_tick: start_tick,
            max_tick: start_tick,
            ..SimStats::default()
        }
    }

    pub fn record(
        &mut self,
        direction: SwapDirection,
        qty_in: &Dec,
        outcome: &SwapOutcome,
        tick_after: i32,
    ) {
        let qty_in = qty_in.to_f64();
        match direction {
            SwapDirection::BaseToQuote => {
                self.volume_base_in += qty_in;
                self.fees_base += outcome.fees_in.to_f64();
            }
            SwapDirection::QuoteToBase => {
                self.volume_quote_in += qty_in;
                self.fees_quote += outcome.fees_in.to_f64();
            }
        }
        // running mean
        let n = self.trades as f64;
        self.mean_slippage =
            (self.mean_slippage * n + outcome.slippage.to_f64()) / (n + 1.0);
        self.trades += 1;
        self.min_tick = self.min_tick.min(tick_after);
        self.max_tick = self.max_tick.max(tick_after);
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    pub fn finish(&mut self, pool_stats: PoolStats) {
        self.final_pool = Some(pool_stats);
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trades:         {} ({} rejected)", self.trades, self.rejected)?;
        writeln!(
            f,
            "volume in:      {:.2} base / {:.2} quote",
            self.volume_base_in, self.volume_quote_in
        )?;
        writeln!(
            f,
            "fees:           {:.4} base / {:.4} quote",
            self.fees_base, self.fees_quote
        )?;
        writeln!(f, "mean slippage:  {:.6}", self.mean_slippage)?;
        writeln!(f, "tick range:     [{}, {}]", self.min_tick, self.max_tick)?;
        if let Some(p) = &self.final_pool {
            writeln!(f, "final tick:     {}", p.tick)?;
            writeln!(
                f,
                "final IL:       {:.6} base / {:.6} quote",
                p.il_base.to_f64(),
                p.il_quote.to_f64()
            )?;
            writeln!(
                f,
                "overall:        {:.2} base / {:.2} quote",
                p.overall.base.to_f64(),
                p.overall.quote.to_f64()
            )?;
            writeln!(
                f,
                "collateral:     {:.4} base / {:.4} quote",
                p.collateral.base.to_f64(),
                p.collateral.quote.to_f64()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftpool_core::Dec;

    fn outcome(out: &str, fees: &str, slip: &str) -> SwapOutcome {
        SwapOutcome {
            qty_out: out.parse().unwrap(),
            fee_factor: Dec::zero(),
            fees_in: fees.parse().unwrap(),
            slippage: slip.parse().unwrap(),
        }
    }

    #[test]
    fn test_record_tracks_sides_and_ticks() {
        let mut stats = SimStats::new(100);
        stats.record(
            SwapDirection::BaseToQuote,
            &"10.1".parse().unwrap(),
            &outcome("10", "0.1", "0.001"),
            95,
        );
        stats.record(
            SwapDirection::QuoteToBase,
            &"5.05".parse().unwrap(),
            &outcome("5", "0.05", "0.003"),
            103,
        );
        assert_eq!(stats.trades, 2);
        assert_eq!(stats.min_tick, 95);
        assert_eq!(stats.max_tick, 103);
        assert!(stats.fees_base > 0.0);
        assert!(stats.fees_quote > 0.0);
        assert!((stats.mean_slippage - 0.002).abs() < 1e-12);
    }
}
