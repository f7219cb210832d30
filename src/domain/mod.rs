//! Market data model, reconciliation and price synthesis.

pub mod app_state;
pub mod catalog;
pub mod entities;
pub mod synthesis;

#[allow(unused_imports)]
pub use app_state::{reconcile, Favorites, LoadPhase, MarketState, SavedPreferences, Selection};
#[allow(unused_imports)]
pub use entities::{
    BaseItem, Category, City, CityId, Dataset, DatasetOrigin, District, DistrictId, ItemId,
    MarketItem, Trend, Unit,
};
#[allow(unused_imports)]
pub use synthesis::{
    city_modifier, fallback_dataset, generate, round1, synthesize, VarianceStrategy,
};
