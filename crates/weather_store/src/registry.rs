//! Airport registry keyed by IATA code.
//!
//! Backed by `DashMap`, so lookups and inserts on different codes never
//! contend. Concurrent adds of the same code are last-writer-wins.

use std::collections::HashSet;

use common::Airport;
use dashmap::DashMap;
use tracing::{info, warn};

/// Thread-safe registry of known airports.
#[derive(Debug, Default)]
pub struct AirportRegistry {
    airports: DashMap<String, Airport>,
}

impl AirportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an airport.
    ///
    /// Returns `false` (and logs) when the code is empty or the coordinates
    /// are out of range; the registry is left untouched in that case.
    pub fn add_airport(&self, iata: &str, latitude: f64, longitude: f64) -> bool {
        self.insert(Airport::new(iata, latitude, longitude))
    }

    /// The code is stored trimmed.
    pub fn insert(&self, mut airport: Airport) -> bool {
        let iata = airport.iata.trim().to_string();
        if iata.is_empty() {
            warn!("Rejected airport with empty IATA code");
            return false;
        }
        airport.iata = iata;
        if !airport.has_valid_coordinates() {
            warn!(
                "Rejected airport {}: coordinates ({}, {}) out of range",
                airport.iata, airport.latitude, airport.longitude
            );
            return false;
        }

        info!(
            "Registered airport {} at ({}, {})",
            airport.iata, airport.latitude, airport.longitude
        );
        self.airports.insert(airport.iata.clone(), airport);
        true
    }

    pub fn get_airport(&self, iata: &str) -> Option<Airport> {
        self.airports.get(iata).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, iata: &str) -> bool {
        self.airports.contains_key(iata)
    }

    pub fn list_codes(&self) -> HashSet<String> {
        self.airports.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Point-in-time copy of every registered airport.
    pub fn all(&self) -> Vec<Airport> {
        self.airports
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Remove the airport only. Callers wanting the reading cascade go
    /// through `WeatherService::delete_airport`.
    pub fn remove(&self, iata: &str) -> Option<Airport> {
        self.airports.remove(iata).map(|(_, airport)| airport)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}
