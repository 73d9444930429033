// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod flight_status;
mod live;
mod render;
mod status;

use std::error::Error;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use mimalloc::MiMalloc;
use opensky_client::GeoBounds;

use config::{AppConfig, API_KEY_ENV};
use flight_status::{FlightQuery, MockFlightSource, RecentFlights, StatusBoard};
use live::LiveOptions;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(version, about = "Live aircraft map and flight status lookup")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the live feed and track aircraft in a viewport
    Live(LiveArgs),
    /// Look up a scheduled flight by number or route
    Lookup(LookupArgs),
    /// List recent flight searches
    Recent {
        /// Show the stored details of one recent flight
        #[arg(long)]
        show: Option<String>,

        /// Look the shown flight up again
        #[arg(long, requires = "show")]
        refresh: bool,
    },
    /// Show the configuration file location and values
    Config {
        /// Write the current values back to the file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug)]
struct LiveArgs {
    /// Seconds between polls
    #[arg(short, long)]
    interval: Option<u64>,

    /// Viewport as S,W,N,E degrees
    #[arg(short, long, value_parser = live::parse_bounds, allow_hyphen_values = true)]
    bounds: Option<GeoBounds>,

    /// Show every aircraft regardless of the viewport
    #[arg(long)]
    all: bool,

    /// Print the first snapshot and exit
    #[arg(long)]
    once: bool,

    /// Feed endpoint
    #[arg(long)]
    feed_url: Option<String>,
}

#[derive(Args, Debug)]
struct LookupArgs {
    /// Flight number, `WS` is added when missing
    #[arg(short, long)]
    flight: Option<String>,

    /// Origin airport code
    #[arg(long)]
    from: Option<String>,

    /// Destination airport code
    #[arg(long)]
    to: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Command::Live(args) => {
            let options = LiveOptions {
                feed_url: args.feed_url.unwrap_or_else(|| config.feed_url.clone()),
                interval: args
                    .interval
                    .map_or_else(|| config.poll_interval(), |s| Duration::from_secs(s.max(1))),
                bounds: args.bounds,
                viewport_aware: config.viewport_aware && !args.all,
                once: args.once,
            };
            runtime.block_on(live::run(&config, options))
        }
        Command::Lookup(args) => runtime.block_on(lookup(&config, &args)),
        Command::Recent { show, refresh } => runtime.block_on(recent(&config, show.as_deref(), refresh)),
        Command::Config { save } => show_config(&config, save),
    }
}

fn open_recent(config: &AppConfig) -> RecentFlights {
    match config
        .recent_flights_path
        .clone()
        .or_else(RecentFlights::default_path)
    {
        Some(path) => RecentFlights::load(path),
        None => {
            warn!("No data directory available, recent searches will not be kept");
            RecentFlights::in_memory()
        }
    }
}

async fn lookup(config: &AppConfig, args: &LookupArgs) -> Result<(), Box<dyn Error>> {
    let query = FlightQuery::from_input(
        args.flight.as_deref().unwrap_or_default(),
        args.from.as_deref().unwrap_or_default(),
        args.to.as_deref().unwrap_or_default(),
    )?;

    if config.flight_api_key().is_none() {
        warn!("No flight API key set ({}), showing simulated data", API_KEY_ENV);
    }

    let mut board = StatusBoard::new(MockFlightSource::new(config.mock_latency()), open_recent(config));
    info!("Searching for {:?}", query);
    let record = board.search(&query).await?;
    println!("{record}");
    if let Some(class) = record.status.indicator_class() {
        info!("Status indicator: {}", class);
    }
    info!("{} recent searches stored", board.recent().len());
    Ok(())
}

async fn recent(config: &AppConfig, show: Option<&str>, refresh: bool) -> Result<(), Box<dyn Error>> {
    let recent = open_recent(config);

    if let Some(flight_number) = show {
        let flight_number = flight_status::normalize_flight_number(flight_number);
        let mut board = StatusBoard::new(MockFlightSource::new(config.mock_latency()), recent);
        match board.load_from_recent(&flight_number) {
            Some(record) => println!("{record}"),
            None => {
                println!("{flight_number} is not in recent searches");
                return Ok(());
            }
        }
        if refresh {
            let record = board.refresh_current().await?;
            println!("\nRefreshed:\n{record}");
        }
        return Ok(());
    }

    if recent.is_empty() {
        println!("No recent searches yet");
        return Ok(());
    }
    if let Some(path) = recent.path() {
        info!("Recent searches from {}", path.display());
    }
    for flight in recent.iter() {
        println!(
            "{:<8} {:<12} {:<10} ({})",
            flight.flight_number,
            flight.route(),
            flight.status,
            flight.status.badge_class()
        );
    }
    Ok(())
}

fn show_config(config: &AppConfig, save: bool) -> Result<(), Box<dyn Error>> {
    match AppConfig::get_config_path() {
        Ok(path) => println!("Config file: {}", path.display()),
        Err(e) => println!("Config file: unknown ({e})"),
    }
    println!("{config:#?}");
    if save {
        config.save()?;
        println!("Saved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_live_args() {
        let cli = Cli::try_parse_from([
            "flightwatch",
            "live",
            "--bounds",
            "35,-10,60,30",
            "--interval",
            "10",
            "--once",
        ])
        .unwrap();
        let Command::Live(args) = cli.command else {
            panic!("expected live");
        };
        assert_eq!(args.interval, Some(10));
        assert!(args.once);
        assert!(args.bounds.is_some());
    }

    #[test]
    fn test_lookup_args() {
        let cli = Cli::try_parse_from(["flightwatch", "lookup", "--from", "yyc", "--to", "yvr"]).unwrap();
        let Command::Lookup(args) = cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(args.from.as_deref(), Some("yyc"));
        assert!(args.flight.is_none());
    }
}
