use clap::Parser;
use marketpulse::cli::{Cli, Commands};
use marketpulse::config::Config;
use marketpulse::strategy::StrategyRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    marketpulse::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting paper trading mode");
            args.execute(config).await?;
        }
        Commands::Strategies => {
            println!("Registered strategies:");
            for name in StrategyRegistry::with_builtins().names() {
                println!("  {name}");
            }
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Asset: {}", config.feed.asset);
            println!("  Markets: {:?}", config.feed.markets);
            println!("  Stream: {}", config.feed.stream_url);
            println!("  Poll interval: {}s", config.feed.poll_interval_secs);
            println!("  Strategies: {:?}", config.engine.strategies);
            println!(
                "  Sim: drift={}, noise_std={}",
                config.sim.drift, config.sim.noise_std
            );
        }
    }

    Ok(())
}
