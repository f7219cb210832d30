use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier for cities, e.g. the licence-plate code `"34"`.
pub type CityId = String;
/// Identifier for market districts, e.g. `"34-1"`.
pub type DistrictId = String;
/// Identifier for catalog items.
pub type ItemId = String;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub id: DistrictId,
    pub city_id: CityId,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Sebze")]
    Vegetable,
    #[serde(rename = "Meyve")]
    Fruit,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Vegetable => "Sebze",
            Category::Fruit => "Meyve",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kg")]
    Weight,
    #[serde(rename = "kasa")]
    Crate,
    #[serde(rename = "adet")]
    Piece,
    #[serde(rename = "bağ")]
    Bunch,
}

impl Unit {
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Weight => "kg",
            Unit::Crate => "kasa",
            Unit::Piece => "adet",
            Unit::Bunch => "bağ",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Stable => "=",
        }
    }
}

/// One priced line of a district's board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketItem {
    pub id: ItemId,
    pub name: String,
    pub category: Category,
    pub unit: Unit,
    pub low_price: f64,
    pub high_price: f64,
    pub avg_price: f64,
    pub trend: Trend,
}

impl MarketItem {
    /// Returns true when `low <= avg <= high`.
    pub fn is_consistent(&self) -> bool {
        self.low_price <= self.avg_price && self.avg_price <= self.high_price
    }
}

/// Catalog entry the synthesizer perturbs into a [`MarketItem`].
#[derive(Clone, Debug, PartialEq)]
pub struct BaseItem {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub unit: Unit,
    pub low_price: f64,
    pub high_price: f64,
    /// Representative price; doubles as the canonical average.
    pub base_price: f64,
}

/// Where the accepted dataset came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DatasetOrigin {
    #[default]
    Unloaded,
    Remote,
    Fallback,
}

/// Full snapshot of cities, districts and per-district prices for one session.
///
/// Never mutated after construction; consumers share it through an `Arc`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub cities: Vec<City>,
    pub districts: Vec<District>,
    pub prices: BTreeMap<DistrictId, Vec<MarketItem>>,
}

impl Dataset {
    pub fn city(&self, id: &str) -> Option<&City> {
        self.cities.iter().find(|city| city.id == id)
    }

    pub fn district(&self, id: &str) -> Option<&District> {
        self.districts.iter().find(|district| district.id == id)
    }

    pub fn districts_of<'a>(&'a self, city_id: &'a str) -> impl Iterator<Item = &'a District> {
        self.districts
            .iter()
            .filter(move |district| district.city_id == city_id)
    }

    /// Prices for a district. Artifacts keyed as `"{cityId}-{districtId}"` are
    /// still honoured when the plain district key is missing.
    pub fn prices_for(&self, district: &District) -> &[MarketItem] {
        self.prices
            .get(&district.id)
            .or_else(|| {
                self.prices
                    .get(&format!("{}-{}", district.city_id, district.id))
            })
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of items across all districts that break `low <= avg <= high`.
    pub fn inconsistent_item_count(&self) -> usize {
        self.prices
            .values()
            .flatten()
            .filter(|item| !item.is_consistent())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn district(id: &str, city_id: &str) -> District {
        District {
            id: id.to_string(),
            city_id: city_id.to_string(),
            name: format!("{id} Hali"),
        }
    }

    fn item(id: &str) -> MarketItem {
        MarketItem {
            id: id.to_string(),
            name: "Limon".to_string(),
            category: Category::Fruit,
            unit: Unit::Crate,
            low_price: 150.0,
            high_price: 200.0,
            avg_price: 175.0,
            trend: Trend::Up,
        }
    }

    #[test]
    fn deserializes_published_shape() {
        let raw = r#"{
            "lastUpdated": "2025-01-01",
            "cities": [{ "id": "34", "name": "İstanbul" }],
            "districts": [{ "id": "34-1", "cityId": "34", "name": "Bayrampaşa Hali" }],
            "prices": {
                "34-1": [{
                    "id": "11", "name": "Limon", "category": "Meyve", "unit": "kasa",
                    "basePrice": 175,
                    "lowPrice": 157.5, "highPrice": 192.5, "avgPrice": 175, "trend": "stable"
                }]
            }
        }"#;

        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.last_updated.as_deref(), Some("2025-01-01"));
        assert_eq!(dataset.districts[0].city_id, "34");
        let items = dataset.prices_for(&dataset.districts[0]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit, Unit::Crate);
        assert_eq!(items[0].trend, Trend::Stable);
    }

    #[test]
    fn serializes_wire_names() {
        let json = serde_json::to_value(item("11")).unwrap();
        assert_eq!(json["category"], "Meyve");
        assert_eq!(json["unit"], "kasa");
        assert_eq!(json["lowPrice"], 150.0);
        assert_eq!(json["trend"], "up");
    }

    #[test]
    fn prices_for_accepts_composite_keys() {
        let d = district("07-2", "07");
        let mut dataset = Dataset {
            districts: vec![d.clone()],
            ..Dataset::default()
        };
        dataset
            .prices
            .insert("07-07-2".to_string(), vec![item("1"), item("2")]);
        assert_eq!(dataset.prices_for(&d).len(), 2);

        dataset.prices.insert("07-2".to_string(), vec![item("3")]);
        assert_eq!(dataset.prices_for(&d)[0].id, "3");
    }

    #[test]
    fn prices_for_unknown_district_is_empty() {
        let dataset = Dataset::default();
        assert!(dataset.prices_for(&district("99-1", "99")).is_empty());
    }

    #[test]
    fn counts_inconsistent_items() {
        let mut broken = item("2");
        broken.avg_price = 250.0;
        let mut dataset = Dataset::default();
        dataset
            .prices
            .insert("34-1".to_string(), vec![item("1"), broken]);
        assert_eq!(dataset.inconsistent_item_count(), 1);
    }
}
