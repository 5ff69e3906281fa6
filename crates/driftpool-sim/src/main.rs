use clap::Parser;
use driftpool_core::{Dec, InitialReserves, Pool};

use driftpool_sim::{SimStats, TradeGenerator};

#[derive(Parser, Debug)]
#[command(name = "driftpool-sim")]
#[command(about = "Drives a driftpool market through generated trade flow")]
struct Args {
    /// Simulated days
    #[arg(long, default_value = "30")]
    days: u32,

    /// Market orders per simulated day
    #[arg(long, default_value = "480")]
    trades_per_day: u32,

    /// Target traded volume per day, in base units
    #[arg(long, default_value = "100000")]
    daily_volume: f64,

    /// Daily relative price volatility driving the pivot walk
    #[arg(long, default_value = "0.02")]
    volatility: f64,

    /// Starting absolute tick
    #[arg(long, default_value = "0")]
    start_tick: i32,

    /// Drifting sub-AMM window width, in ticks
    #[arg(long, default_value = "1000")]
    tick_span: i32,

    /// Initial base-side reserve
    #[arg(long, default_value = "1000000")]
    base_reserve: u64,

    /// Initial quote-side reserve
    #[arg(long, default_value = "1000000")]
    quote_reserve: u64,

    /// RNG seed for reproducible runs
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Emit the statistics as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    log::info!("Starting driftpool simulation");
    log::info!(
        "{} days x {} trades, volatility {}, seed {}",
        args.days,
        args.trades_per_day,
        args.volatility,
        args.seed
    );

    let mut pool = Pool::new(
        args.start_tick,
        args.tick_span,
        None,
        Some(InitialReserves {
            base: Dec::from(args.base_reserve),
            quote: Dec::from(args.quote_reserve),
        }),
    )?;
    let mut generator = TradeGenerator::new(
        args.seed,
        args.start_tick,
        args.volatility,
        args.daily_volume,
        args.trades_per_day,
    );
    let mut stats = SimStats::new(args.start_tick);

    for day in 0..args.days {
        for _ in 0..args.trades_per_day {
            let trade = generator.next_trade(pool.cur_absolute_tick());
            // clone-and-adopt: a failed swap leaves the original untouched
            let mut candidate = pool.clone();
            match candidate.swap(trade.direction, trade.qty_in.clone()) {
                Ok(outcome) => {
                    stats.record(
                        trade.direction,
                        &trade.qty_in,
                        &outcome,
                        candidate.cur_absolute_tick(),
                    );
                    pool = candidate;
                }
                Err(e) => {
                    log::warn!("swap rejected: {}", e);
                    stats.record_rejected();
                }
            }
        }
        log::info!(
            "day {} done: tick {} fee_factor {:.5}",
            day + 1,
            pool.cur_absolute_tick(),
            pool.fee_factor().to_f64()
        );
    }

    stats.finish(pool.stats());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", stats);
    }
    Ok(())
}
