//! The weather service: owner of the registry, the store and the counters.
//!
//! Every dependency is injected, so tests and adapters can share or swap
//! individual components.

use std::collections::HashSet;
use std::sync::Arc;

use common::config::StoreConfig;
use common::{Airport, AtmosphericRecord, DataPoint, Error, FrequencyReport, MeasurementKind};
use tracing::{info, warn};

use crate::atmosphere::AtmosphericStore;
use crate::proximity;
use crate::registry::AirportRegistry;
use crate::stats::UsageStats;

#[derive(Debug, Clone)]
pub struct WeatherService {
    registry: Arc<AirportRegistry>,
    store: Arc<AtmosphericStore>,
    stats: Arc<UsageStats>,
}

impl WeatherService {
    pub fn new(
        registry: Arc<AirportRegistry>,
        store: Arc<AtmosphericStore>,
        stats: Arc<UsageStats>,
    ) -> Self {
        Self {
            registry,
            store,
            stats,
        }
    }

    /// Build fresh components from `config` and register its seed airports.
    ///
    /// Seed entries that fail validation are logged and skipped.
    pub fn from_config(config: &StoreConfig) -> Self {
        let service = Self::new(
            Arc::new(AirportRegistry::new()),
            Arc::new(AtmosphericStore::with_retry(config.retry.clone())),
            Arc::new(UsageStats::with_config(config.stats.clone())),
        );
        for seed in &config.airports {
            service.add_airport(&seed.iata, seed.latitude, seed.longitude);
        }
        info!("Weather service ready with {} airports", service.registry.len());
        service
    }

    pub fn registry(&self) -> &Arc<AirportRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<AtmosphericStore> {
        &self.store
    }

    pub fn stats(&self) -> &Arc<UsageStats> {
        &self.stats
    }

    // ── Airports ──────────────────────────────────────────────────────

    pub fn add_airport(&self, iata: &str, latitude: f64, longitude: f64) -> bool {
        self.registry.add_airport(iata, latitude, longitude)
    }

    pub fn get_airport(&self, iata: &str) -> Option<Airport> {
        self.registry.get_airport(iata)
    }

    pub fn list_codes(&self) -> HashSet<String> {
        self.registry.list_codes()
    }

    /// Remove the airport together with its reading and usage counter.
    pub fn delete_airport(&self, iata: &str) {
        if iata.is_empty() {
            warn!("Cannot delete airport: empty IATA code");
            return;
        }
        // Registry first: a writer that swaps in after this point sees the
        // airport gone and discards its own record.
        let removed = self.registry.remove(iata).is_some();
        self.store.delete_reading(iata);
        self.stats.forget_airport(iata);
        if removed {
            info!("Deleted airport {}", iata);
        }
    }

    // ── Readings ──────────────────────────────────────────────────────

    /// Store one sensor reading for `iata`.
    ///
    /// Fails with `InvalidArgument` for an empty or unknown code, an
    /// unrecognized point type, or a mean outside the field's range.
    pub fn update_reading(&self, iata: &str, point_type: &str, point: DataPoint) -> Result<(), Error> {
        self.update_reading_with(iata, point_type, point, || {})
    }

    fn update_reading_with<F: FnMut()>(
        &self,
        iata: &str,
        point_type: &str,
        point: DataPoint,
        before_swap: F,
    ) -> Result<(), Error> {
        if iata.trim().is_empty() {
            return Err(Error::invalid("IATA code is empty"));
        }
        if !self.registry.contains(iata) {
            return Err(Error::invalid(format!("unknown IATA code '{iata}'")));
        }
        let kind: MeasurementKind = point_type.parse()?;

        let stored = self.store.merge_with(iata, kind, point, before_swap)?;
        if !self.registry.contains(iata) {
            // Deleted while the merge ran.
            self.store.discard(iata, &stored);
            warn!("{}: airport deleted during {} update, reading dropped", iata, kind);
            return Err(Error::invalid(format!("unknown IATA code '{iata}'")));
        }
        info!("{}: {} updated (mean={})", iata, kind, point.mean);
        Ok(())
    }

    /// Same as [`update_reading`](Self::update_reading), taking the
    /// collector's raw JSON body. An empty or `null` body is a missing
    /// data point.
    pub fn collect(&self, iata: &str, point_type: &str, payload: &str) -> Result<(), Error> {
        let trimmed = payload.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(Error::invalid("data point is missing"));
        }
        let point = DataPoint::from_json(trimmed)?;
        self.update_reading(iata, point_type, point)
    }

    pub fn get_reading(&self, iata: &str) -> Option<Arc<AtmosphericRecord>> {
        if iata.is_empty() {
            return None;
        }
        self.store.get_reading(iata)
    }

    pub fn delete_reading(&self, iata: &str) {
        if iata.is_empty() {
            warn!("Cannot delete atmospheric information: empty IATA code");
            return;
        }
        self.store.delete_reading(iata);
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn find_nearby(&self, iata: &str, radius_km: f64) -> Vec<Airport> {
        proximity::find_nearby(&self.registry, iata, radius_km)
    }

    pub fn find_nearby_readings(&self, iata: &str, radius_km: f64) -> Vec<Arc<AtmosphericRecord>> {
        proximity::find_nearby_readings(&self.registry, &self.store, iata, radius_km)
    }

    /// A counted weather query: records the request, then returns the
    /// readings around `iata`.
    pub fn query_weather(&self, iata: &str, radius_km: f64) -> Vec<Arc<AtmosphericRecord>> {
        self.stats.record_request(&self.registry, iata, radius_km);
        self.find_nearby_readings(iata, radius_km)
    }

    // ── Usage ─────────────────────────────────────────────────────────

    pub fn record_request(&self, iata: &str, radius_km: f64) {
        self.stats.record_request(&self.registry, iata, radius_km);
    }

    pub fn report(&self) -> FrequencyReport {
        self.stats.report(&self.registry, &self.store)
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}
