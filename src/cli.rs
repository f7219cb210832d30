use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    app::{MarketConfig, MarketDataController},
    domain::{DatasetOrigin, MarketState},
    infra::{
        artifact::{write_artifact, GenerateError, DEFAULT_ARTIFACT_PATH},
        preferences::{FilePreferenceStore, PreferenceStore},
        remote::{FetchError, RemoteDatasetFetcher},
    },
    util::persistence::PersistenceError,
};

#[derive(Parser)]
#[command(name = "hal-market")]
#[command(about = "Wholesale produce prices by city and market", long_about = None)]
pub struct Cli {
    /// URL of the published dataset
    #[arg(long, env = "HAL_MARKET_URL", global = true)]
    url: Option<String>,
    /// Seconds to wait for the dataset before using built-in prices
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Preference file (defaults to the platform config directory)
    #[arg(long, global = true)]
    prefs: Option<PathBuf>,
    /// City used when no saved city matches the dataset
    #[arg(long, global = true)]
    default_city: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show prices for the selected market
    Show,
    /// List cities and their markets
    Cities,
    /// Select a city (clears the selected market)
    SetCity { id: String },
    /// Select a market of the current city
    SetDistrict { id: String },
    /// Add or remove an item from favorites
    ToggleFavorite { item_id: String },
    /// Write a freshly generated dataset file
    Generate {
        #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
        out: PathBuf,
        /// Seed for reproducible prices
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid dataset URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Storage(#[from] PersistenceError),
    #[error(transparent)]
    Client(#[from] FetchError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("unknown city: {0}")]
    UnknownCity(String),
    #[error("market {district} is not in the selected city {city}")]
    UnknownDistrict { district: String, city: String },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<(), CliError> {
    let command = cli.command.unwrap_or(Commands::Show);
    if let Commands::Generate { out, seed } = &command {
        let dataset = write_artifact(out, *seed).await?;
        println!(
            "Wrote {} markets across {} cities to {}",
            dataset.districts.len(),
            dataset.cities.len(),
            out.display()
        );
        return Ok(());
    }

    let mut config = MarketConfig::new()?;
    if let Some(url) = cli.url.as_deref() {
        config = config.with_dataset_url(url)?;
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(city_id) = cli.default_city {
        config = config.with_default_city(city_id);
    }

    let store = match cli.prefs {
        Some(path) => FilePreferenceStore::new(path),
        None => FilePreferenceStore::in_config_dir()?,
    };
    info!(path = %store.path().display(), "Using preference file");

    let fetcher = RemoteDatasetFetcher::new(config.dataset_url.clone(), config.fetch_timeout)?;
    let mut controller = MarketDataController::new(Arc::new(store), config);
    controller.initialize(&fetcher).await;

    let result = apply(&mut controller, command);
    controller.flush().await;
    result?;

    print_board(controller.state());
    Ok(())
}

fn apply<S: PreferenceStore>(
    controller: &mut MarketDataController<S>,
    command: Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Show | Commands::Generate { .. } => {}
        Commands::Cities => print_cities(controller.state()),
        Commands::SetCity { id } => {
            let city = controller
                .dataset()
                .city(&id)
                .cloned()
                .ok_or(CliError::UnknownCity(id))?;
            controller.set_city(city);
        }
        Commands::SetDistrict { id } => {
            let dataset = controller.dataset();
            let city_id = controller
                .state()
                .selected_city()
                .map(|c| c.id.clone())
                .unwrap_or_default();
            let district = dataset
                .district(&id)
                .filter(|d| d.city_id == city_id)
                .cloned()
                .ok_or(CliError::UnknownDistrict {
                    district: id,
                    city: city_id,
                })?;
            controller.set_district(district);
        }
        Commands::ToggleFavorite { item_id } => {
            let added = controller.toggle_favorite(&item_id);
            println!(
                "{} {item_id}",
                if added { "Favorited" } else { "Unfavorited" }
            );
        }
    }
    Ok(())
}

fn print_cities(state: &MarketState) {
    for city in &state.dataset.cities {
        println!("{} {}", city.id, city.name);
        for district in state.dataset.districts_of(&city.id) {
            println!("    {} {}", district.id, district.name);
        }
    }
}

fn print_board(state: &MarketState) {
    let source = match state.origin {
        DatasetOrigin::Remote => "published",
        DatasetOrigin::Fallback => "built-in",
        DatasetOrigin::Unloaded => "no",
    };
    let city = state
        .selected_city()
        .map(|c| c.name.as_str())
        .unwrap_or("-");
    let Some(district) = state.selected_district() else {
        println!("{city}: no market selected ({source} data)");
        return;
    };

    println!(
        "{city}, {} ({source} data{})",
        district.name,
        state
            .dataset
            .last_updated
            .as_deref()
            .map(|d| format!(", {d}"))
            .unwrap_or_default()
    );
    for item in state.dataset.prices_for(district) {
        let star = if state.favorites.contains(&item.id) { "*" } else { " " };
        println!(
            "{star} {:>3} {:<24} {:<6} {:>8.1} {:>8.1} {:>8.1} {} /{}",
            item.id,
            item.name,
            item.category.label(),
            item.low_price,
            item.avg_price,
            item.high_price,
            item.trend.arrow(),
            item.unit.label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_show() {
        let cli = Cli::try_parse_from(["hal-market"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hal-market",
            "set-city",
            "34",
            "--timeout-secs",
            "3",
            "--url",
            "http://localhost/marketData.json",
        ])
        .unwrap();
        assert_eq!(cli.timeout_secs, Some(3));
        assert!(matches!(cli.command, Some(Commands::SetCity { ref id }) if id == "34"));
    }

    #[test]
    fn generate_has_default_output() {
        let cli = Cli::try_parse_from(["hal-market", "generate", "--seed", "4"]).unwrap();
        match cli.command {
            Some(Commands::Generate { out, seed }) => {
                assert_eq!(out, PathBuf::from(DEFAULT_ARTIFACT_PATH));
                assert_eq!(seed, Some(4));
            }
            _ => panic!("expected generate"),
        }
    }
}
