use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use pogoda_core::{Config, ConfigError};
use pogoda_ui::error_mapping::location_app_error;
use pogoda_ui::{render, AppServices, LaunchOptions, WeatherUi, WeatherViewModel};
use pogoda_weather::{Coordinate, LocationResolver};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot};

/// Current weather for your location, with a fixed fallback.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Do not ask for the device location
    #[arg(long)]
    no_location: bool,

    /// Treat this coordinate as the device location
    #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinate, allow_hyphen_values = true)]
    at: Option<Coordinate>,

    /// Print the final state as JSON instead of the card
    #[arg(long)]
    json: bool,

    /// Exit on error instead of offering a retry
    #[arg(long)]
    no_retry: bool,

    /// Only resolve and print the device location
    #[arg(long, conflicts_with = "json")]
    locate_only: bool,
}

fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| "expected LAT,LON".to_string())?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude: {lat}"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude: {lon}"))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude out of range: {lat}"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude out of range: {lon}"));
    }
    Ok(Coordinate::new(lat, lon))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    pogoda_core::init()?;

    let (config, _) = match Config::load_validated(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            if let Some(config_error) = e.downcast_ref::<ConfigError>() {
                eprintln!("{}", config_error.user_message());
            }
            return Err(e.context("Failed to load configuration"));
        }
    };

    let options = LaunchOptions {
        location_permitted: args.no_location.then_some(false),
        manual_location: args.at,
    };
    let services = match AppServices::from_config(&config, &options) {
        Ok(services) => services,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    if args.locate_only {
        return locate(services.resolver()).await;
    }

    let vm = services.view_model();
    tracing::info!("Pogoda started (fallback {})", vm.fallback());

    drive(&vm, vm.start(services.location_permitted()), args.json).await;

    let interactive = !args.no_retry && !args.json && std::io::stdin().is_terminal();
    if interactive {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while matches!(vm.state(), WeatherUi::Error { .. }) {
            println!("\nPress r and Enter to retry, or Enter to quit.");
            match lines.next_line().await? {
                Some(line) if line.trim().eq_ignore_ascii_case("r") => {
                    drive(&vm, vm.reload(), false).await;
                }
                _ => break,
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&vm.state())?);
    }

    Ok(match vm.state() {
        WeatherUi::Content(_) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Runs one load while printing every state it publishes.
async fn drive(vm: &WeatherViewModel, load: impl Future<Output = ()>, quiet: bool) {
    let transitions = vm.transitions();
    let (done_tx, done_rx) = oneshot::channel();

    let load = async move {
        load.await;
        let _ = done_tx.send(());
    };

    if quiet {
        drop(transitions);
        load.await;
    } else {
        tokio::join!(load, print_transitions(transitions, done_rx));
    }
}

async fn print_transitions(
    mut rx: broadcast::Receiver<WeatherUi>,
    mut done: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            state = rx.recv() => match state {
                Ok(state) => print_state(&state),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Display skipped {} state updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut done => {
                while let Ok(state) = rx.try_recv() {
                    print_state(&state);
                }
                break;
            }
        }
    }
}

fn print_state(state: &WeatherUi) {
    match state {
        WeatherUi::Content(_) => println!("\n{}", render(state)),
        _ => println!("{}", render(state)),
    }
}

async fn locate(resolver: &LocationResolver) -> Result<ExitCode> {
    tracing::info!(
        "Resolving location via {} ({:?})",
        resolver.locator_name(),
        resolver.priority()
    );

    match resolver.resolve().await {
        Ok(Some(coordinate)) => {
            println!("{}", coordinate);
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            println!("No location fix available");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            let app_error = location_app_error(e);
            tracing::error!("Location request failed: {}", app_error);
            eprintln!("{}", app_error.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(
            parse_coordinate("55.75, 37.62").unwrap(),
            Coordinate::new(55.75, 37.62)
        );
        assert_eq!(
            parse_coordinate("-33.87,151.21").unwrap(),
            Coordinate::new(-33.87, 151.21)
        );
    }

    #[test]
    fn test_parse_coordinate_rejects_bad_input() {
        assert!(parse_coordinate("55.75").is_err());
        assert!(parse_coordinate("abc,1").is_err());
        assert!(parse_coordinate("91,0").is_err());
        assert!(parse_coordinate("0,181").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["pogoda", "--at", "-10.5,20", "--no-retry"]).unwrap();
        assert_eq!(args.at, Some(Coordinate::new(-10.5, 20.0)));
        assert!(args.no_retry);
        assert!(!args.no_location);
    }
}
