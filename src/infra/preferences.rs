//! Durable key-value store for the user's location and favorites.

use std::{collections::BTreeMap, future::Future, io, path::PathBuf};

use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::util::persistence::{preferences_file, write_json_atomic, PersistenceError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrefKey {
    SelectedCityId,
    SelectedDistrictId,
    Favorites,
}

impl PrefKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefKey::SelectedCityId => "selectedCityId",
            PrefKey::SelectedDistrictId => "selectedDistrictId",
            PrefKey::Favorites => "favorites",
        }
    }
}

pub trait PreferenceStore: Send + Sync + 'static {
    fn get(
        &self,
        key: PrefKey,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;

    fn set(
        &self,
        key: PrefKey,
        value: String,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn remove(&self, key: PrefKey) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Stores every key in one JSON object on disk. Writes are serialized through a
/// lock and land via temp-file rename.
pub struct FilePreferenceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store under the platform config directory.
    pub fn in_config_dir() -> Result<Self, PersistenceError> {
        preferences_file()
            .map(Self::new)
            .ok_or(PersistenceError::StorageUnavailable)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, PersistenceError> {
        match fs::read_to_string(&self.path).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn update<F>(&self, key: PrefKey, apply: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) + Send,
    {
        let _guard = self.lock.lock().await;
        let mut entries = match self.load().await {
            Ok(entries) => entries,
            Err(PersistenceError::Serde(err)) => {
                warn!(path = %self.path.display(), error = %err, "Replacing unreadable preference file");
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        apply(&mut entries);
        write_json_atomic(&self.path, &entries).await?;
        debug!(key = key.as_str(), path = %self.path.display(), "Preference written");
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    async fn get(&self, key: PrefKey) -> Result<Option<String>, PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        Ok(entries.remove(key.as_str()))
    }

    async fn set(&self, key: PrefKey, value: String) -> Result<(), PersistenceError> {
        self.update(key, move |entries| {
            entries.insert(key.as_str().to_string(), value);
        })
        .await
    }

    async fn remove(&self, key: PrefKey) -> Result<(), PersistenceError> {
        self.update(key, |entries| {
            entries.remove(key.as_str());
        })
        .await
    }
}
