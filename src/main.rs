//! hgw CLI entry point.
//!
//! Runs the poll loop over the in-memory loopback bus: useful for exercising
//! the installation, the rules and the command router without hardware.
//! Lines read from stdin are dispatched as events (`name` or `name=arg`),
//! so a session looks like:
//!
//! ```bash
//! echo "salon=down:10" | cargo run -- run
//! ```
//!
//! A real deployment embeds the library instead and supplies its own
//! `ExpanderBus` over the actual I2C master.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;

use hgw::clock::LocalDaylight;
use hgw::core::config::{example_toml, HomeConfig};
use hgw::core::error::Result;
use hgw::core::logging::TracingLog;
use hgw::prelude::LoopbackBus;
use hgw::Home;

/// Home Gateway - expander-bank polling and event dispatch
#[derive(Parser, Debug)]
#[command(name = "hgw", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the poll loop over the loopback bus
    Run {
        /// Configuration file (TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Periodically print poll statistics as JSON
        #[arg(long)]
        stats: bool,
    },

    /// Print an example configuration
    ExampleConfig,

    /// List every labelled pin of the installation
    ListPins,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, stats } => run(config, stats).await,
        Commands::ExampleConfig => {
            print!("{}", example_toml());
            Ok(())
        }
        Commands::ListPins => list_pins(),
    }
}

async fn run(config_path: Option<PathBuf>, stats: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => HomeConfig::load(path)?,
        None => HomeConfig::default(),
    };

    let day = LocalDaylight::from_config(&config.nightlight)?;
    let mut home = Home::new(
        &config,
        Box::new(LoopbackBus::new()),
        Box::new(day),
        Arc::new(TracingLog),
    )?;

    tracing::info!(
        "hgw running, tick {} ms, {} labelled pins",
        config.tick_ms,
        home.io().names().len()
    );

    let mut ticker = tokio::time::interval(config.tick());
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                home.tick();
                if stats && home.ticks() % 100 == 0 {
                    println!("{}", poll_stats(&home));
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        let event = line.trim();
                        if !event.is_empty() && !home.dispatch_event(event) {
                            tracing::warn!("unknown event '{}'", event);
                        }
                    }
                    None => stdin_open = false,
                }
            }
        }
    }
}

fn poll_stats(home: &Home) -> serde_json::Value {
    serde_json::json!({
        "ticks": home.ticks(),
        "pending_writes": home.io().pending_writes(),
        "nightlight": home.nightlight_active(),
        "muted": home.io().muted(),
    })
}

fn list_pins() -> Result<()> {
    let config = HomeConfig::default();
    let day = LocalDaylight::from_config(&config.nightlight)?;
    let home = Home::new(
        &config,
        Box::new(LoopbackBus::new()),
        Box::new(day),
        Arc::new(hgw::core::logging::NullLog),
    )?;

    println!("Labelled pins (pin = chip * 16 + bit, chips at 0x20..0x27):");
    println!();
    for (pin, label) in home.io().names().iter() {
        println!("  {:3}  (chip {}, bit {:2})  {}", pin, pin / 16, pin % 16, label);
    }

    Ok(())
}
