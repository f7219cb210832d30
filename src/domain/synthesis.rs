//! Synthetic price generation.
//!
//! Two variance policies exist and stay separate: the offline generator draws a
//! uniform delta around each base price, while the client fallback shifts the
//! canonical low/avg/high triple by a fixed per-city modifier.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{
    catalog,
    entities::{BaseItem, City, Dataset, District, MarketItem, Trend},
};

/// Half-width of the generator's uniform price delta.
pub const RANGED_SPREAD: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VarianceStrategy {
    /// `avg = round1(base + U(-spread, spread))`, low/high at 90%/110% of avg.
    Ranged { spread: f64 },
    /// Adds the same amount to the canonical low, avg and high prices. The
    /// amount may be negative; the triple moves together so its order holds.
    FixedModifier(i32),
}

impl VarianceStrategy {
    pub fn ranged() -> Self {
        VarianceStrategy::Ranged {
            spread: RANGED_SPREAD,
        }
    }

    pub fn for_city(city_id: &str) -> Self {
        VarianceStrategy::FixedModifier(city_modifier(city_id))
    }
}

/// `parseInt(cityId) % 5`: optional sign plus leading decimal digits of the id,
/// reduced mod 5 with the sign kept, so the result is in `-4..=4`.
/// Ids without leading digits map to 0.
pub fn city_modifier(city_id: &str) -> i32 {
    let id = city_id.trim_start();
    let (sign, digits) = match id.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, id.strip_prefix('+').unwrap_or(id)),
    };
    let magnitude = digits
        .chars()
        .map_while(|ch| ch.to_digit(10))
        .fold(0, |acc, digit| (acc * 10 + digit) % 5);
    sign * magnitude as i32
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn synthesize<R: Rng + ?Sized>(
    base_items: &[BaseItem],
    variance: VarianceStrategy,
    rng: &mut R,
) -> Vec<MarketItem> {
    base_items
        .iter()
        .map(|item| {
            let (low_price, avg_price, high_price) = match variance {
                VarianceStrategy::Ranged { spread } => {
                    let delta = if spread > 0.0 {
                        rng.gen_range(-spread..spread)
                    } else {
                        0.0
                    };
                    // Clamped so the 0.9/1.1 scaling keeps low <= avg <= high.
                    let avg = round1((item.base_price + delta).max(0.0));
                    (round1(avg * 0.9), avg, round1(avg * 1.1))
                }
                VarianceStrategy::FixedModifier(modifier) => {
                    let shift = f64::from(modifier);
                    (
                        item.low_price + shift,
                        item.base_price + shift,
                        item.high_price + shift,
                    )
                }
            };

            MarketItem {
                id: item.id.to_string(),
                name: item.name.to_string(),
                category: item.category,
                unit: item.unit,
                low_price,
                high_price,
                avg_price,
                trend: random_trend(rng),
            }
        })
        .collect()
}

// Stable is never drawn; only published data carries it.
fn random_trend<R: Rng + ?Sized>(rng: &mut R) -> Trend {
    if rng.gen_bool(0.5) {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Builds a full dataset with ranged variance for every district. Each district
/// gets its own stream seeded from one draw of `rng`.
pub fn generate<R: Rng + ?Sized>(
    cities: Vec<City>,
    districts: Vec<District>,
    base_items: &[BaseItem],
    last_updated: Option<String>,
    rng: &mut R,
) -> Dataset {
    let prices = districts
        .iter()
        .map(|district| {
            let mut district_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            (
                district.id.clone(),
                synthesize(base_items, VarianceStrategy::ranged(), &mut district_rng),
            )
        })
        .collect::<BTreeMap<_, _>>();

    Dataset {
        last_updated,
        cities,
        districts,
        prices,
    }
}

/// In-memory dataset used when the published one is unavailable.
pub fn fallback_dataset<R: Rng + ?Sized>(rng: &mut R) -> Dataset {
    let cities = catalog::cities();
    let districts = catalog::districts();
    let prices = districts
        .iter()
        .map(|district| {
            (
                district.id.clone(),
                synthesize(
                    catalog::BASE_ITEMS,
                    VarianceStrategy::for_city(&district.city_id),
                    rng,
                ),
            )
        })
        .collect::<BTreeMap<_, _>>();

    Dataset {
        last_updated: None,
        cities,
        districts,
        prices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Category, Unit};

    fn tomato() -> BaseItem {
        BaseItem {
            id: "1",
            name: "Domates (Salkım)",
            category: Category::Vegetable,
            unit: Unit::Weight,
            low_price: 25.0,
            high_price: 35.0,
            base_price: 30.0,
        }
    }

    #[test]
    fn modifier_follows_leading_digits() {
        assert_eq!(city_modifier("34"), 4);
        assert_eq!(city_modifier("07"), 2);
        assert_eq!(city_modifier("06"), 1);
        assert_eq!(city_modifier("35"), 0);
        assert_eq!(city_modifier("33-x"), 3);
        assert_eq!(city_modifier("abc"), 0);
        assert_eq!(city_modifier("99999999999999999999999"), 4);
    }

    #[test]
    fn modifier_keeps_the_sign() {
        assert_eq!(city_modifier("-3"), -3);
        assert_eq!(city_modifier("-34"), -4);
        assert_eq!(city_modifier("+34"), 4);
        assert_eq!(city_modifier(" -7x"), -2);
        assert_eq!(city_modifier("-"), 0);
        assert_eq!(city_modifier("--3"), 0);
    }

    #[test]
    fn negative_modifier_keeps_triple_ordered() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let items = synthesize(&[tomato()], VarianceStrategy::for_city("-34"), &mut rng);
        assert_eq!(items[0].low_price, 21.0);
        assert_eq!(items[0].avg_price, 26.0);
        assert_eq!(items[0].high_price, 31.0);
        assert!(items[0].is_consistent());
    }

    #[test]
    fn fixed_modifier_shifts_canonical_triple() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let items = synthesize(&[tomato()], VarianceStrategy::for_city("34"), &mut rng);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].low_price, 29.0);
        assert_eq!(items[0].high_price, 39.0);
        assert_eq!(items[0].avg_price, 34.0);
    }

    #[test]
    fn ranged_stays_within_spread_and_ordered() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let item = &synthesize(&[tomato()], VarianceStrategy::ranged(), &mut rng)[0];
            assert!(item.avg_price >= 28.0 && item.avg_price <= 32.0);
            assert_eq!(item.low_price, round1(item.avg_price * 0.9));
            assert_eq!(item.high_price, round1(item.avg_price * 1.1));
            assert!(item.is_consistent());
            assert_ne!(item.trend, Trend::Stable);
        }
    }

    #[test]
    fn ranged_clamps_negative_averages() {
        let mut cheap = tomato();
        cheap.base_price = 0.5;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let item = &synthesize(&[cheap.clone()], VarianceStrategy::ranged(), &mut rng)[0];
            assert!(item.avg_price >= 0.0);
            assert!(item.is_consistent());
        }
    }

    #[test]
    fn same_seed_same_prices() {
        let a = synthesize(
            catalog::BASE_ITEMS,
            VarianceStrategy::ranged(),
            &mut ChaCha8Rng::seed_from_u64(42),
        );
        let b = synthesize(
            catalog::BASE_ITEMS,
            VarianceStrategy::ranged(),
            &mut ChaCha8Rng::seed_from_u64(42),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_prices_every_district() {
        let dataset = fallback_dataset(&mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(dataset.cities.len(), 5);
        assert!(dataset.last_updated.is_none());
        for district in &dataset.districts {
            let items = dataset.prices_for(district);
            assert_eq!(items.len(), catalog::BASE_ITEMS.len(), "{}", district.id);
        }
        let antalya = dataset.prices.get("07-3").unwrap();
        assert_eq!(antalya[0].avg_price, 32.0);
    }

    #[test]
    fn generate_keys_by_district_id() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let dataset = generate(
            catalog::cities(),
            catalog::districts(),
            catalog::BASE_ITEMS,
            Some("2025-01-01".to_string()),
            &mut rng,
        );
        assert_eq!(dataset.prices.len(), dataset.districts.len());
        for district in &dataset.districts {
            assert!(dataset.prices.contains_key(&district.id));
        }
        assert_eq!(dataset.inconsistent_item_count(), 0);
    }

    #[test]
    fn generate_is_reproducible_per_seed() {
        let run = |seed| {
            generate(
                catalog::cities(),
                catalog::districts(),
                catalog::BASE_ITEMS,
                None,
                &mut ChaCha8Rng::seed_from_u64(seed),
            )
        };
        assert_eq!(run(5), run(5));
        assert_ne!(run(5).prices, run(6).prices);
    }
}
