//! Run command implementation
//!
//! Wires the full pipeline: price stream into the aggregator, aggregator
//! into snapshots, snapshots through the strategy engine, and the winning
//! signal into a simulated paper trade whose outcome feeds back into the
//! strategy's performance counters.

use crate::aggregator::PriceAggregator;
use crate::config::Config;
use crate::engine::StrategyEngine;
use crate::feed::{AggregatorFeed, FixedSentiment, SnapshotFeed};
use crate::sim::{GaussianSimulator, TradeSimulator};
use crate::stream::{PriceStreamClient, StreamConfig};
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this many evaluation cycles (default: run until Ctrl-C)
    #[arg(long)]
    pub cycles: Option<u64>,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let aggregator = PriceAggregator::new();
        let stream = PriceStreamClient::new(StreamConfig {
            url: config.feed.stream_url.clone(),
            ..Default::default()
        });

        for market in &config.feed.markets {
            aggregator.track_on(&stream, market).await;
        }
        if config.feed.markets.is_empty() {
            tracing::warn!("No markets configured; snapshots will be empty");
        } else {
            stream.start().await;
        }

        let mut engine = build_engine(&config)?;
        tracing::info!(
            strategies = ?engine.active_strategies(),
            "Engine ready"
        );

        let mut simulator = match config.sim.seed {
            Some(seed) => GaussianSimulator::seeded(config.sim.drift, config.sim.noise_std, seed),
            None => GaussianSimulator::new(config.sim.drift, config.sim.noise_std),
        };

        let mut feed = AggregatorFeed::new(
            &config.feed.asset,
            aggregator.clone(),
            Box::new(FixedSentiment::default()),
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(config.feed.poll_interval_secs.max(1)));
        let mut cycle = 0u64;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested");
                    break;
                }

                _ = interval.tick() => {
                    cycle += 1;

                    match feed.next_snapshot().await {
                        Some(snapshot) => {
                            if let Some(signal) = engine.best_signal(&snapshot) {
                                tracing::info!(
                                    strategy = %signal.strategy,
                                    direction = %signal.direction,
                                    confidence = %signal.confidence,
                                    reason = %signal.reason,
                                    "Signal selected"
                                );
                                let result = simulator.simulate(&signal, snapshot.price);
                                tracing::info!(
                                    trade = %result.id,
                                    strategy = %result.strategy,
                                    entry = %result.entry_price,
                                    exit = %result.exit_price,
                                    pnl_pct = %result.pnl_pct,
                                    "Paper trade closed"
                                );
                                engine.record_trade(&result);
                            }
                        }
                        None => tracing::debug!(cycle, "No market data yet"),
                    }

                    if config.engine.report_interval_cycles > 0
                        && cycle % config.engine.report_interval_cycles == 0
                    {
                        log_performance(&engine);
                    }

                    if self.cycles.is_some_and(|max| cycle >= max) {
                        tracing::info!(cycle, "Cycle budget reached");
                        break;
                    }
                }
            }
        }

        stream.stop().await;
        log_performance(&engine);
        Ok(())
    }
}

/// Build the engine from the configured strategy list, parameter tables and
/// optional definitions directory. Bad entries are skipped with a warning so
/// one typo does not take the whole run down.
fn build_engine(config: &Config) -> anyhow::Result<StrategyEngine> {
    let mut engine = StrategyEngine::with_builtins();

    for name in &config.engine.strategies {
        let params = config.engine.params.get(name);
        if let Err(e) = engine.add_strategy(name, params) {
            tracing::warn!(strategy = %name, error = %e, "Skipping strategy");
        }
    }

    if let Some(dir) = &config.engine.definitions_dir {
        let loaded = engine.registry().load_directory(dir)?;
        for entry in loaded {
            let name = entry.definition.instance_name().to_string();
            engine.add_strategy_instance(name, entry.strategy);
        }
    }

    Ok(engine)
}

fn log_performance(engine: &StrategyEngine) {
    for (name, perf) in engine.performance_report() {
        tracing::info!(
            strategy = %name,
            trades = perf.trades,
            wins = perf.wins,
            win_rate = %perf.win_rate.round_dp(3),
            total_pnl = %perf.total_pnl.round_dp(3),
            "Strategy performance"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_engine_defaults() {
        let engine = build_engine(&Config::default()).unwrap();
        assert_eq!(
            engine.active_strategies(),
            vec!["momentum", "vwap", "arbitrage", "leadlag", "sentiment"]
        );
    }

    #[test]
    fn test_build_engine_skips_unknown_names() {
        let config: Config =
            toml::from_str("[engine]\nstrategies = [\"momentum\", \"quantum\"]").unwrap();
        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.active_strategies(), vec!["momentum"]);
    }

    #[test]
    fn test_build_engine_passes_params() {
        let config: Config = toml::from_str(
            "[engine]\nstrategies = [\"momentum\"]\n[engine.params.momentum]\nwindow = 30",
        )
        .unwrap();
        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.active_strategies(), vec!["momentum"]);
    }
}
