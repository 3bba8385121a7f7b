//! airport-weather: operator front-end for the airport weather store.
//!
//! Builds a store from the configured seed airports and runs one command
//! against it, printing the result as JSON.

mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use weather_store::WeatherService;

/// Airport weather store
#[derive(Parser)]
#[command(name = "airport-weather", about = "Airport atmospheric readings and proximity queries")]
struct Cli {
    /// TOML config file. Defaults to ./config.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every registered IATA code.
    Airports,
    /// Show one airport.
    Airport { iata: String },
    /// Airports within RADIUS km of IATA.
    Nearby { iata: String, radius: f64 },
    /// Submit a reading and print the resulting record.
    Collect {
        iata: String,
        point_type: String,
        /// Data point JSON with first, second, third, mean, count.
        payload: String,
    },
    /// Usage report after running the given weather queries.
    Report {
        /// Queries as IATA:RADIUS, e.g. BOS:100.
        #[arg(long = "query")]
        queries: Vec<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), common::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_query(raw: &str) -> Result<(String, f64), common::Error> {
    let (iata, radius) = raw
        .split_once(':')
        .ok_or_else(|| common::Error::invalid(format!("query '{raw}' is not IATA:RADIUS")))?;
    let radius = radius
        .trim()
        .parse::<f64>()
        .map_err(|_| common::Error::invalid(format!("radius '{radius}' is not a number")))?;
    Ok((iata.trim().to_ascii_uppercase(), radius))
}

fn run(service: &WeatherService, command: Command) -> Result<(), common::Error> {
    match command {
        Command::Airports => {
            let mut codes: Vec<String> = service.list_codes().into_iter().collect();
            codes.sort();
            print_json(&codes)
        }
        Command::Airport { iata } => print_json(&service.get_airport(&iata.to_ascii_uppercase())),
        Command::Nearby { iata, radius } => {
            print_json(&service.find_nearby(&iata.to_ascii_uppercase(), radius))
        }
        Command::Collect {
            iata,
            point_type,
            payload,
        } => {
            let iata = iata.to_ascii_uppercase();
            service.collect(&iata, &point_type, &payload)?;
            print_json(&service.get_reading(&iata).as_deref())
        }
        Command::Report { queries } => {
            for raw in &queries {
                let (iata, radius) = parse_query(raw)?;
                service.query_weather(&iata, radius);
            }
            print_json(&service.report())
        }
    }
}

fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airport_weather=info,weather_store=info".into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Retry policy: backoff={}ms, max_attempts={:?}",
        cfg.retry.backoff_ms, cfg.retry.max_attempts
    );

    let service = WeatherService::from_config(&cfg);

    if let Err(e) = run(&service, cli.command) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        assert_eq!(parse_query("bos:100").unwrap(), ("BOS".to_string(), 100.0));
        assert!(parse_query("BOS").is_err());
        assert!(parse_query("BOS:far").is_err());
    }
}
