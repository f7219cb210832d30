//! Offline generation of the published dataset file.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};
use tracing::info;

use crate::domain::{catalog, generate, Dataset};
use crate::util::persistence::{write_json_atomic, PersistenceError};

/// Relative path the generator writes to; the same file is served remotely.
pub const DEFAULT_ARTIFACT_PATH: &str = "data/marketData.json";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to write dataset: {0}")]
    Persist(#[from] PersistenceError),
    #[error("failed to format date: {0}")]
    Format(#[from] time::error::Format),
}

fn today() -> Result<String, time::error::Format> {
    OffsetDateTime::now_utc()
        .date()
        .format(format_description!("[year]-[month]-[day]"))
}

/// Builds the catalog dataset stamped with today's date.
pub fn build_dataset<R: Rng + ?Sized>(rng: &mut R) -> Result<Dataset, GenerateError> {
    Ok(generate(
        catalog::cities(),
        catalog::districts(),
        catalog::BASE_ITEMS,
        Some(today()?),
        rng,
    ))
}

/// Generates a dataset and replaces the artifact at `path`.
pub async fn write_artifact(path: &Path, seed: Option<u64>) -> Result<Dataset, GenerateError> {
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let dataset = build_dataset(&mut rng)?;
    info!(
        date = dataset.last_updated.as_deref().unwrap_or("-"),
        districts = dataset.districts.len(),
        "Generated market dataset"
    );
    write_json_atomic(path, &dataset).await?;
    info!(path = %path.display(), "Dataset saved");
    Ok(dataset)
}
