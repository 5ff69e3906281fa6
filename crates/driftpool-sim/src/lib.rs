//! Simulation harness for the driftpool engine: a volatility-driven trade
//! generator and run statistics. The engine itself never touches floating
//! point; everything float-valued here is sampling or display.

pub mod generator;
pub mod stats;

pub use generator::{Trade, TradeGenerator};
pub use stats::SimStats;
