use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::entities::{City, Dataset, DatasetOrigin, District, ItemId};

/// Startup progress as seen by the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Loading,
    Ready,
}

/// Favorite item ids. Kept in insertion order so the persisted list is stable;
/// only membership matters to callers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites(Vec<ItemId>);

impl Favorites {
    pub fn contains(&self, item_id: &str) -> bool {
        self.0.iter().any(|id| id == item_id)
    }

    /// Adds the id if missing, removes it otherwise. Returns the new membership.
    pub fn toggle(&mut self, item_id: &str) -> bool {
        if let Some(pos) = self.0.iter().position(|id| id == item_id) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(item_id.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Unreadable payloads yield an empty set.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Vec<ItemId>>(raw) {
            Ok(ids) => {
                let mut favorites = Favorites::default();
                for id in ids {
                    if !favorites.contains(&id) {
                        favorites.0.push(id);
                    }
                }
                favorites
            }
            Err(err) => {
                warn!(error = %err, "Discarding unreadable favorites");
                Favorites::default()
            }
        }
    }
}

/// Raw values read back from the preference store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SavedPreferences {
    pub city_id: Option<String>,
    pub district_id: Option<String>,
    pub favorites: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub city: Option<City>,
    pub district: Option<District>,
}

/// Maps saved ids onto the accepted dataset. Missing or stale ids fall back to
/// the default city (when present), then the first city, then nothing.
pub fn reconcile(
    dataset: &Dataset,
    saved: &SavedPreferences,
    default_city_id: &str,
) -> (Selection, Favorites) {
    let city = saved
        .city_id
        .as_deref()
        .and_then(|id| dataset.city(id))
        .or_else(|| {
            if saved.city_id.is_some() {
                debug!(saved = ?saved.city_id, "Saved city not in dataset");
            }
            dataset.city(default_city_id)
        })
        .or_else(|| dataset.cities.first())
        .cloned();

    let district = city.as_ref().and_then(|city| {
        saved
            .district_id
            .as_deref()
            .and_then(|id| dataset.district(id))
            .filter(|district| district.city_id == city.id)
            .or_else(|| dataset.districts_of(&city.id).next())
            .cloned()
    });

    let favorites = saved
        .favorites
        .as_deref()
        .map(Favorites::from_json)
        .unwrap_or_default();

    (Selection { city, district }, favorites)
}

/// Everything the UI layer reads.
#[derive(Clone, Debug, Default)]
pub struct MarketState {
    pub dataset: Arc<Dataset>,
    pub origin: DatasetOrigin,
    pub selection: Selection,
    pub favorites: Favorites,
    pub phase: LoadPhase,
}

impl MarketState {
    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn selected_city(&self) -> Option<&City> {
        self.selection.city.as_ref()
    }

    pub fn selected_district(&self) -> Option<&District> {
        self.selection.district.as_ref()
    }
}
