//! Concurrent airport weather store.
//!
//! Holds the airport registry, the per-airport atmospheric records and the
//! usage counters, and answers proximity queries over them.

pub mod atmosphere;
pub mod proximity;
pub mod registry;
pub mod service;
pub mod stats;

pub use atmosphere::AtmosphericStore;
pub use proximity::{find_nearby, find_nearby_readings, haversine_km, EARTH_RADIUS_KM};
pub use registry::AirportRegistry;
pub use service::WeatherService;
pub use stats::{radius_bucket, UsageStats, MAX_RADIUS_BUCKET};
