//! Great-circle proximity queries over the registry.
//!
//! A linear scan of every registered airport; fine for the few thousand
//! airports the registry is expected to hold.

use std::sync::Arc;

use common::{Airport, AtmosphericRecord};
use tracing::debug;

use crate::atmosphere::AtmosphericStore;
use crate::registry::AirportRegistry;

/// Mean Earth radius used by the haversine formula, in km.
pub const EARTH_RADIUS_KM: f64 = 6372.8;

/// Haversine distance between two airports in km.
pub fn haversine_km(a: &Airport, b: &Airport) -> f64 {
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();
    let lat_cosines = a.latitude.to_radians().cos() * b.latitude.to_radians().cos();

    let h = (delta_lat / 2.0).sin().powi(2) + (delta_lon / 2.0).sin().powi(2) * lat_cosines;
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Airports within `radius_km` of `iata`, the origin included.
///
/// The boundary is inclusive. An empty or unknown code yields nothing.
pub fn find_nearby(registry: &AirportRegistry, iata: &str, radius_km: f64) -> Vec<Airport> {
    if iata.is_empty() {
        return Vec::new();
    }
    let Some(origin) = registry.get_airport(iata) else {
        debug!("Nearby query for unknown airport {}", iata);
        return Vec::new();
    };

    registry
        .all()
        .into_iter()
        .filter(|candidate| haversine_km(&origin, candidate) <= radius_km)
        .collect()
}

/// Records of the airports within `radius_km` of `iata`.
///
/// Airports without a reading are skipped. Order is unspecified.
pub fn find_nearby_readings(
    registry: &AirportRegistry,
    store: &AtmosphericStore,
    iata: &str,
    radius_km: f64,
) -> Vec<Arc<AtmosphericRecord>> {
    find_nearby(registry, iata, radius_km)
        .iter()
        .filter_map(|airport| store.get_reading(&airport.iata))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{DataPoint, MeasurementKind};

    fn make_registry() -> AirportRegistry {
        let registry = AirportRegistry::new();
        registry.add_airport("AAA", 1.0, 1.0);
        registry.add_airport("BBB", 2.0, 2.0);
        registry
    }

    fn wind(mean: f64) -> DataPoint {
        DataPoint {
            first: 10.0,
            second: 20.0,
            third: 30.0,
            mean,
            count: 50,
        }
    }

    fn codes(airports: &[Airport]) -> Vec<String> {
        let mut out: Vec<String> = airports.iter().map(|a| a.iata.clone()).collect();
        out.sort();
        out
    }

    #[test]
    fn test_distance_is_symmetric_and_zero_to_self() {
        let bos = Airport::new("BOS", 42.364347, -71.005181);
        let jfk = Airport::new("JFK", 40.639751, -73.778925);

        assert_eq!(haversine_km(&bos, &bos), 0.0);
        let there = haversine_km(&bos, &jfk);
        let back = haversine_km(&jfk, &bos);
        assert!((there - back).abs() < 1e-9, "{there} != {back}");
    }

    #[test]
    fn test_distance_matches_known_value() {
        let bos = Airport::new("BOS", 42.364347, -71.005181);
        let jfk = Airport::new("JFK", 40.639751, -73.778925);

        // Published great-circle distance is roughly 301 km.
        let distance = haversine_km(&bos, &jfk);
        assert!((295.0..310.0).contains(&distance), "got {distance}");
    }

    #[test]
    fn test_antipodes_do_not_produce_nan() {
        let a = Airport::new("AAA", 0.0, 0.0);
        let b = Airport::new("BBB", 0.0, 180.0);
        let distance = haversine_km(&a, &b);
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_find_nearby_small_and_large_radius() {
        let registry = make_registry();

        assert_eq!(codes(&find_nearby(&registry, "AAA", 1.0)), vec!["AAA"]);
        assert_eq!(
            codes(&find_nearby(&registry, "AAA", 1000.0)),
            vec!["AAA", "BBB"]
        );
    }

    #[test]
    fn test_find_nearby_boundary_is_inclusive() {
        let registry = make_registry();
        let a = registry.get_airport("AAA").unwrap();
        let b = registry.get_airport("BBB").unwrap();
        let exact = haversine_km(&a, &b);

        assert_eq!(find_nearby(&registry, "AAA", exact).len(), 2);
        assert_eq!(find_nearby(&registry, "AAA", 0.0).len(), 1);
    }

    #[test]
    fn test_find_nearby_unknown_or_empty_code() {
        let registry = make_registry();
        assert!(find_nearby(&registry, "", 1000.0).is_empty());
        assert!(find_nearby(&registry, "ZZZ", 1000.0).is_empty());
        assert!(find_nearby(&registry, "AAA", -1.0).is_empty());
    }

    #[test]
    fn test_find_nearby_readings_skips_airports_without_data() {
        let registry = make_registry();
        let store = AtmosphericStore::new();

        assert!(find_nearby_readings(&registry, &store, "AAA", 1.0).is_empty());

        store.merge("BBB", MeasurementKind::Wind, wind(40.0)).unwrap();
        assert!(find_nearby_readings(&registry, &store, "AAA", 1.0).is_empty());
        assert_eq!(find_nearby_readings(&registry, &store, "AAA", 1000.0).len(), 1);

        store.merge("AAA", MeasurementKind::Wind, wind(20.0)).unwrap();
        assert_eq!(find_nearby_readings(&registry, &store, "AAA", 1.0).len(), 1);
        assert_eq!(find_nearby_readings(&registry, &store, "AAA", 1000.0).len(), 2);
    }

    #[test]
    fn test_find_nearby_readings_unknown_code() {
        let registry = make_registry();
        let store = AtmosphericStore::new();
        store.merge("AAA", MeasurementKind::Wind, wind(20.0)).unwrap();

        assert!(find_nearby_readings(&registry, &store, "", 1000.0).is_empty());
        assert!(find_nearby_readings(&registry, &store, "ZZZ", 1000.0).is_empty());
    }
}
