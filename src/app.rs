#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reqwest::Url;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::{
    domain::{
        fallback_dataset, reconcile, City, Dataset, DatasetOrigin, District, LoadPhase,
        MarketState, SavedPreferences, Selection,
    },
    infra::{
        preferences::{PrefKey, PreferenceStore},
        remote::{DatasetSource, DEFAULT_DATASET_URL, DEFAULT_FETCH_TIMEOUT},
    },
};

/// City picked when nothing valid was saved (Antalya).
pub const DEFAULT_CITY_ID: &str = "07";

#[derive(Clone, Debug)]
pub struct MarketConfig {
    pub dataset_url: Url,
    pub fetch_timeout: Duration,
    pub default_city_id: String,
}

impl MarketConfig {
    pub fn new() -> Result<Self, url::ParseError> {
        Ok(Self {
            dataset_url: Url::parse(DEFAULT_DATASET_URL)?,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            default_city_id: DEFAULT_CITY_ID.to_string(),
        })
    }

    pub fn with_dataset_url(mut self, url: &str) -> Result<Self, url::ParseError> {
        self.dataset_url = Url::parse(url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_default_city(mut self, city_id: impl Into<String>) -> Self {
        self.default_city_id = city_id.into();
        self
    }
}

enum PrefWrite {
    Set(PrefKey, String),
    Remove(PrefKey),
    Flush(oneshot::Sender<()>),
}

/// Applies preference writes on a single task, in the order they were queued.
struct PrefWriter {
    tx: mpsc::UnboundedSender<PrefWrite>,
}

impl PrefWriter {
    fn spawn<S: PreferenceStore>(store: Arc<S>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PrefWrite>();
        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    PrefWrite::Set(key, value) => {
                        if let Err(err) = store.set(key, value).await {
                            warn!(key = key.as_str(), error = %err, "Failed to persist preference");
                        }
                    }
                    PrefWrite::Remove(key) => {
                        if let Err(err) = store.remove(key).await {
                            warn!(key = key.as_str(), error = %err, "Failed to remove preference");
                        }
                    }
                    PrefWrite::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            debug!("Preference writer stopped");
        });
        Self { tx }
    }

    fn send(&self, op: PrefWrite) {
        if self.tx.send(op).is_err() {
            warn!("Preference writer is gone; write dropped");
        }
    }

    async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        self.send(PrefWrite::Flush(ack));
        let _ = done.await;
    }
}

/// Owns the session's market state: loads a dataset, reconciles saved
/// preferences against it and writes user choices back to the store.
///
/// Must be created inside a tokio runtime.
pub struct MarketDataController<S: PreferenceStore> {
    store: Arc<S>,
    writer: PrefWriter,
    config: MarketConfig,
    state: MarketState,
    phase: watch::Sender<LoadPhase>,
    rng: ChaCha8Rng,
}

impl<S: PreferenceStore> MarketDataController<S> {
    pub fn new(store: Arc<S>, config: MarketConfig) -> Self {
        let (phase, _) = watch::channel(LoadPhase::Loading);
        Self {
            writer: PrefWriter::spawn(store.clone()),
            store,
            config,
            state: MarketState::default(),
            phase,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Fixes the random source used for the fallback dataset.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn dataset(&self) -> Arc<Dataset> {
        self.state.dataset.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadPhase> {
        self.phase.subscribe()
    }

    /// Startup pass: fetch (or synthesize) a dataset, read saved preferences,
    /// reconcile. Runs once; later calls are ignored.
    pub async fn initialize<D: DatasetSource>(&mut self, source: &D) {
        if self.state.phase == LoadPhase::Ready {
            warn!("Market data already initialized; ignoring");
            return;
        }

        let (fetched, saved) = tokio::join!(source.fetch(), read_preferences(&*self.store));

        let (dataset, origin) = match fetched {
            Ok(dataset) => {
                let inconsistent = dataset.inconsistent_item_count();
                if inconsistent > 0 {
                    warn!(
                        items = inconsistent,
                        "Remote dataset has prices outside low <= avg <= high"
                    );
                }
                (dataset, DatasetOrigin::Remote)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Remote dataset unavailable; using fallback");
                (fallback_dataset(&mut self.rng), DatasetOrigin::Fallback)
            }
        };

        let (selection, favorites) = reconcile(&dataset, &saved, &self.config.default_city_id);
        info!(
            origin = ?origin,
            city = selection.city.as_ref().map(|c| c.id.as_str()).unwrap_or("-"),
            district = selection.district.as_ref().map(|d| d.id.as_str()).unwrap_or("-"),
            favorites = favorites.len(),
            "Market data ready"
        );

        self.state = MarketState {
            dataset: Arc::new(dataset),
            origin,
            selection,
            favorites,
            phase: LoadPhase::Ready,
        };
        self.phase.send_replace(LoadPhase::Ready);
    }

    /// Selects a city and clears the district.
    pub fn set_city(&mut self, city: City) {
        debug!(city = %city.id, "City selected");
        self.writer
            .send(PrefWrite::Set(PrefKey::SelectedCityId, city.id.clone()));
        self.writer
            .send(PrefWrite::Remove(PrefKey::SelectedDistrictId));
        self.state.selection = Selection {
            city: Some(city),
            district: None,
        };
    }

    /// Selects a district. The caller passes one belonging to the current city.
    pub fn set_district(&mut self, district: District) {
        debug!(district = %district.id, "District selected");
        self.writer
            .send(PrefWrite::Set(PrefKey::SelectedDistrictId, district.id.clone()));
        self.state.selection.district = Some(district);
    }

    /// Flips membership of `item_id`; returns whether it is now a favorite.
    pub fn toggle_favorite(&mut self, item_id: &str) -> bool {
        let added = self.state.favorites.toggle(item_id);
        match self.state.favorites.to_json() {
            Ok(json) => self.writer.send(PrefWrite::Set(PrefKey::Favorites, json)),
            Err(err) => warn!(error = %err, "Failed to encode favorites"),
        }
        added
    }

    /// Waits until every write queued so far has been applied.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

async fn read_preferences<S: PreferenceStore>(store: &S) -> SavedPreferences {
    let (city_id, district_id, favorites) = tokio::join!(
        read_key(store, PrefKey::SelectedCityId),
        read_key(store, PrefKey::SelectedDistrictId),
        read_key(store, PrefKey::Favorites),
    );
    SavedPreferences {
        city_id,
        district_id,
        favorites,
    }
}

async fn read_key<S: PreferenceStore>(store: &S, key: PrefKey) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(err) => {
            warn!(key = key.as_str(), error = %err, "Failed to read preference");
            None
        }
    }
}
