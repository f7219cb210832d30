//! Built-in cities, market districts and reference prices.
//!
//! Used by the offline generator and by the client when the published dataset
//! cannot be fetched.

use super::entities::{BaseItem, Category, City, District, Unit};

const CITIES: &[(&str, &str)] = &[
    ("34", "İstanbul"),
    ("06", "Ankara"),
    ("07", "Antalya"),
    ("33", "Mersin"),
    ("35", "İzmir"),
];

const DISTRICTS: &[(&str, &str, &str)] = &[
    ("34-1", "34", "Bayrampaşa Hali"),
    ("34-2", "34", "Ataşehir Hali"),
    ("06-1", "06", "Ankara Toptancı Hali"),
    ("07-1", "07", "Antalya Merkez Hali"),
    ("07-2", "07", "Gazipaşa Hali"),
    ("07-3", "07", "Kumluca Hali"),
    ("33-1", "33", "Mersin Merkez Hali"),
    ("35-1", "35", "İzmir Merkez Hali"),
];

const fn base(
    id: &'static str,
    name: &'static str,
    category: Category,
    unit: Unit,
    low_price: f64,
    high_price: f64,
    base_price: f64,
) -> BaseItem {
    BaseItem {
        id,
        name,
        category,
        unit,
        low_price,
        high_price,
        base_price,
    }
}

pub const BASE_ITEMS: &[BaseItem] = &[
    base("1", "Domates (Salkım)", Category::Vegetable, Unit::Weight, 25.0, 35.0, 30.0),
    base("2", "Domates (Beef)", Category::Vegetable, Unit::Weight, 30.0, 45.0, 38.0),
    base("3", "Salatalık", Category::Vegetable, Unit::Weight, 15.0, 22.0, 18.0),
    base("4", "Biber (Çarliston)", Category::Vegetable, Unit::Weight, 20.0, 28.0, 24.0),
    base("5", "Patlıcan", Category::Vegetable, Unit::Weight, 18.0, 25.0, 22.0),
    base("6", "Patates", Category::Vegetable, Unit::Weight, 12.0, 18.0, 15.0),
    base("7", "Soğan (Kuru)", Category::Vegetable, Unit::Weight, 10.0, 16.0, 13.0),
    base("8", "Elma (Starking)", Category::Fruit, Unit::Weight, 20.0, 30.0, 25.0),
    base("9", "Muz (Yerli)", Category::Fruit, Unit::Weight, 35.0, 45.0, 40.0),
    base("10", "Portakal (Washington)", Category::Fruit, Unit::Weight, 15.0, 22.0, 18.0),
    base("11", "Limon", Category::Fruit, Unit::Crate, 150.0, 200.0, 175.0),
    base("12", "Çilek", Category::Fruit, Unit::Weight, 60.0, 90.0, 75.0),
];

pub fn cities() -> Vec<City> {
    CITIES
        .iter()
        .map(|(id, name)| City {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

pub fn districts() -> Vec<District> {
    DISTRICTS
        .iter()
        .map(|(id, city_id, name)| District {
            id: id.to_string(),
            city_id: city_id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_district_points_at_a_known_city() {
        let cities = cities();
        for district in districts() {
            assert!(
                cities.iter().any(|c| c.id == district.city_id),
                "orphan district {}",
                district.id
            );
        }
    }

    #[test]
    fn base_items_are_ordered() {
        for item in BASE_ITEMS {
            assert!(item.low_price <= item.base_price && item.base_price <= item.high_price);
        }
    }
}
