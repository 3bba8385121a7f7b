//! Usage counters and the frequency report built from them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use common::config::StatsConfig;
use common::FrequencyReport;
use dashmap::DashMap;
use tracing::debug;

use crate::atmosphere::AtmosphericStore;
use crate::registry::AirportRegistry;

/// Largest radius bucket; bigger radii are counted here.
pub const MAX_RADIUS_BUCKET: usize = 1000;

/// Integer floor of the radius clamped to `[0, MAX_RADIUS_BUCKET]`.
pub fn radius_bucket(radius: f64) -> usize {
    if radius.is_nan() {
        return 0;
    }
    radius.clamp(0.0, MAX_RADIUS_BUCKET as f64).floor() as usize
}

/// Process-lifetime request counters.
#[derive(Debug, Default)]
pub struct UsageStats {
    requests_by_airport: DashMap<String, AtomicU64>,
    requests_by_radius: DashMap<usize, AtomicU64>,
    config: StatsConfig,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StatsConfig) -> Self {
        Self {
            requests_by_airport: DashMap::new(),
            requests_by_radius: DashMap::new(),
            config,
        }
    }

    /// Count a weather query. Unknown airports are ignored.
    pub fn record_request(&self, registry: &AirportRegistry, iata: &str, radius: f64) {
        if !registry.contains(iata) {
            debug!("Not counting request for unknown airport {:?}", iata);
            return;
        }

        increment(&self.requests_by_airport, iata.to_string());
        increment(&self.requests_by_radius, radius_bucket(radius));
    }

    /// Request count recorded for one airport.
    pub fn requests_for(&self, iata: &str) -> u64 {
        self.requests_by_airport
            .get(iata)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Drop the counter of an airport that no longer exists.
    pub fn forget_airport(&self, iata: &str) {
        self.requests_by_airport.remove(iata);
    }

    pub fn report(&self, registry: &AirportRegistry, store: &AtmosphericStore) -> FrequencyReport {
        let cutoff = Utc::now() - self.config.recent_window();
        let recent_record_count = store.count_recent(cutoff);

        // One snapshot feeds both numerator and denominator, so counters
        // left behind by a deleted airport never dilute the fractions.
        let counts: Vec<(String, u64)> = registry
            .all()
            .into_iter()
            .map(|airport| {
                let count = self.requests_for(&airport.iata);
                (airport.iata, count)
            })
            .collect();
        let total: u64 = counts.iter().map(|(_, count)| count).sum();

        let mut airport_frequency_fraction = BTreeMap::new();
        if total > 0 {
            for (iata, count) in counts {
                airport_frequency_fraction.insert(iata, count as f64 / total as f64);
            }
        }

        FrequencyReport {
            recent_record_count,
            airport_frequency_fraction,
            radius_histogram: self.radius_histogram(),
        }
    }

    fn radius_histogram(&self) -> Vec<u64> {
        let counts: Vec<(usize, u64)> = self
            .requests_by_radius
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect();

        let Some(max_bucket) = counts.iter().map(|(bucket, _)| *bucket).max() else {
            return Vec::new();
        };

        let mut histogram = vec![0; max_bucket.min(MAX_RADIUS_BUCKET) + 1];
        for (bucket, count) in counts {
            if let Some(slot) = histogram.get_mut(bucket) {
                *slot += count;
            }
        }
        histogram
    }

    /// Clear both counter maps.
    pub fn reset(&self) {
        self.requests_by_radius.clear();
        self.requests_by_airport.clear();
    }
}

fn increment<K>(counters: &DashMap<K, AtomicU64>, key: K)
where
    K: std::hash::Hash + Eq,
{
    if let Some(counter) = counters.get(&key) {
        counter.fetch_add(1, Ordering::Relaxed);
        return;
    }
    counters
        .entry(key)
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{DataPoint, MeasurementKind};

    fn make_registry() -> AirportRegistry {
        let registry = AirportRegistry::new();
        registry.add_airport("BOS", 42.364347, -71.005181);
        registry.add_airport("JFK", 40.639751, -73.778925);
        registry.add_airport("LGA", 40.777245, -73.872608);
        registry
    }

    #[test]
    fn test_radius_bucket_clamps() {
        assert_eq!(radius_bucket(-5.0), 0);
        assert_eq!(radius_bucket(0.0), 0);
        assert_eq!(radius_bucket(10.9), 10);
        assert_eq!(radius_bucket(1000.0), 1000);
        assert_eq!(radius_bucket(5000.0), 1000);
        assert_eq!(radius_bucket(f64::NAN), 0);
        assert_eq!(radius_bucket(f64::INFINITY), 1000);
    }

    #[test]
    fn test_unknown_airport_not_counted() {
        let registry = make_registry();
        let stats = UsageStats::new();

        stats.record_request(&registry, "ZZZ", 10.0);
        stats.record_request(&registry, "", 10.0);

        let report = stats.report(&registry, &AtmosphericStore::new());
        assert!(report.airport_frequency_fraction.is_empty());
        assert!(report.radius_histogram.is_empty());
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let registry = make_registry();
        let stats = UsageStats::new();

        stats.record_request(&registry, "BOS", 0.0);
        stats.record_request(&registry, "BOS", 5.0);
        stats.record_request(&registry, "BOS", 5.0);
        stats.record_request(&registry, "JFK", 200.0);

        let report = stats.report(&registry, &AtmosphericStore::new());
        let fractions = &report.airport_frequency_fraction;

        assert_eq!(fractions.len(), 3, "every registered airport is listed");
        assert!((fractions["BOS"] - 0.75).abs() < 1e-12);
        assert!((fractions["JFK"] - 0.25).abs() < 1e-12);
        assert_eq!(fractions["LGA"], 0.0);

        let sum: f64 = fractions.values().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn test_counter_of_unregistered_airport_is_excluded() {
        let registry = make_registry();
        let stats = UsageStats::new();

        stats.record_request(&registry, "BOS", 10.0);
        stats.record_request(&registry, "BOS", 10.0);
        // Unregistered without its counter being dropped.
        registry.remove("BOS");
        stats.record_request(&registry, "JFK", 10.0);

        let report = stats.report(&registry, &AtmosphericStore::new());
        let fractions = &report.airport_frequency_fraction;

        assert!(!fractions.contains_key("BOS"));
        assert_eq!(fractions["JFK"], 1.0);
        let sum: f64 = fractions.values().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn test_histogram_is_dense_and_clamped() {
        let registry = make_registry();
        let stats = UsageStats::new();

        stats.record_request(&registry, "BOS", 2.5);
        stats.record_request(&registry, "BOS", 2.9);
        stats.record_request(&registry, "JFK", 5.0);

        let histogram = stats.report(&registry, &AtmosphericStore::new()).radius_histogram;
        assert_eq!(histogram, vec![0, 0, 2, 0, 0, 1]);

        stats.record_request(&registry, "JFK", 5000.0);
        let histogram = stats.report(&registry, &AtmosphericStore::new()).radius_histogram;
        assert_eq!(histogram.len(), MAX_RADIUS_BUCKET + 1);
        assert_eq!(histogram[MAX_RADIUS_BUCKET], 1);
    }

    #[test]
    fn test_recent_record_count() {
        let registry = make_registry();
        let store = AtmosphericStore::new();
        let stats = UsageStats::new();

        let point = DataPoint {
            first: 1.0,
            second: 2.0,
            third: 3.0,
            mean: 20.0,
            count: 4,
        };
        store.merge("BOS", MeasurementKind::Temperature, point).unwrap();
        store.merge("JFK", MeasurementKind::Wind, point).unwrap();

        assert_eq!(stats.report(&registry, &store).recent_record_count, 2);

        let expired = UsageStats::with_config(StatsConfig {
            recent_window_secs: 0,
        });
        assert_eq!(expired.report(&registry, &store).recent_record_count, 0);
    }

    #[test]
    fn test_reset_clears_counters() {
        let registry = make_registry();
        let stats = UsageStats::new();
        stats.record_request(&registry, "BOS", 10.0);

        stats.reset();

        let report = stats.report(&registry, &AtmosphericStore::new());
        assert!(report.airport_frequency_fraction.is_empty());
        assert!(report.radius_histogram.is_empty());
        assert_eq!(stats.requests_for("BOS"), 0);
    }

    #[test]
    fn test_concurrent_requests_are_all_counted() {
        let registry = make_registry();
        let stats = UsageStats::new();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        stats.record_request(&registry, "LGA", 50.0);
                    }
                });
            }
        });

        assert_eq!(stats.requests_for("LGA"), 1000);
        let histogram = stats.report(&registry, &AtmosphericStore::new()).radius_histogram;
        assert_eq!(histogram[50], 1000);
    }
}
