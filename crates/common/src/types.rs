//! Domain types shared across the store and its adapters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

// ── Airports ──────────────────────────────────────────────────────────

/// A registered airport location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    /// Three letter IATA code, the registry key.
    pub iata: String,
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
}

impl Airport {
    pub fn new(iata: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            iata: iata.into(),
            latitude,
            longitude,
        }
    }

    /// NaN coordinates fail both range checks.
    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ── Sensor readings ───────────────────────────────────────────────────

/// Five-number summary of one sensor's recent readings.
///
/// `first`, `second` and `third` are percentile markers chosen by the
/// producer. The store only looks at `mean`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub first: f64,
    pub second: f64,
    pub third: f64,
    pub mean: f64,
    pub count: i64,
}

impl DataPoint {
    /// Parse the collector payload, e.g.
    /// `{"first":10,"second":20,"third":30,"mean":40,"count":50}`.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// The atmospheric quantities an airport record can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Wind,
    Temperature,
    Humidity,
    Pressure,
    CloudCover,
    Precipitation,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 6] = [
        MeasurementKind::Wind,
        MeasurementKind::Temperature,
        MeasurementKind::Humidity,
        MeasurementKind::Pressure,
        MeasurementKind::CloudCover,
        MeasurementKind::Precipitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Wind => "wind",
            MeasurementKind::Temperature => "temperature",
            MeasurementKind::Humidity => "humidity",
            MeasurementKind::Pressure => "pressure",
            MeasurementKind::CloudCover => "cloudcover",
            MeasurementKind::Precipitation => "precipitation",
        }
    }

    /// Whether `mean` is a plausible value for this quantity.
    ///
    /// Lower bounds are inclusive, upper bounds exclusive. Wind has no
    /// upper bound.
    pub fn accepts_mean(&self, mean: f64) -> bool {
        match self {
            MeasurementKind::Wind => mean >= 0.0,
            MeasurementKind::Temperature => (-50.0..100.0).contains(&mean),
            MeasurementKind::Humidity => (0.0..100.0).contains(&mean),
            MeasurementKind::Pressure => (650.0..800.0).contains(&mean),
            MeasurementKind::CloudCover => (0.0..100.0).contains(&mean),
            MeasurementKind::Precipitation => (0.0..100.0).contains(&mean),
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementKind {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Err(Error::invalid("point type is empty"));
        }
        match lowered.as_str() {
            "wind" => Ok(MeasurementKind::Wind),
            "temperature" => Ok(MeasurementKind::Temperature),
            // Collectors in the field still send the old misspelling.
            "humidity" | "humidty" => Ok(MeasurementKind::Humidity),
            "pressure" => Ok(MeasurementKind::Pressure),
            "cloudcover" => Ok(MeasurementKind::CloudCover),
            "precipitation" => Ok(MeasurementKind::Precipitation),
            _ => Err(Error::invalid(format!("unknown point type '{raw}'"))),
        }
    }
}

// ── Atmospheric records ───────────────────────────────────────────────

/// Current atmospheric state of one airport.
///
/// Records are never mutated in place: [`AtmosphericRecord::with_field`]
/// returns the successor value, which the store swaps in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtmosphericRecord {
    /// Degrees celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<DataPoint>,
    /// km/h.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<DataPoint>,
    /// Percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<DataPoint>,
    /// mmHg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<DataPoint>,
    /// Percent, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<DataPoint>,
    /// cm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<DataPoint>,
    pub last_update_time: DateTime<Utc>,
}

impl AtmosphericRecord {
    /// A record with no readings, stamped at the epoch.
    pub fn empty() -> Self {
        Self {
            temperature: None,
            wind: None,
            humidity: None,
            pressure: None,
            cloud_cover: None,
            precipitation: None,
            last_update_time: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn field(&self, kind: MeasurementKind) -> Option<&DataPoint> {
        match kind {
            MeasurementKind::Wind => self.wind.as_ref(),
            MeasurementKind::Temperature => self.temperature.as_ref(),
            MeasurementKind::Humidity => self.humidity.as_ref(),
            MeasurementKind::Pressure => self.pressure.as_ref(),
            MeasurementKind::CloudCover => self.cloud_cover.as_ref(),
            MeasurementKind::Precipitation => self.precipitation.as_ref(),
        }
    }

    /// Copy of `self` with `kind` replaced by `point`.
    ///
    /// The timestamp never moves backwards, even if the wall clock does.
    pub fn with_field(&self, kind: MeasurementKind, point: DataPoint, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        let slot = match kind {
            MeasurementKind::Wind => &mut next.wind,
            MeasurementKind::Temperature => &mut next.temperature,
            MeasurementKind::Humidity => &mut next.humidity,
            MeasurementKind::Pressure => &mut next.pressure,
            MeasurementKind::CloudCover => &mut next.cloud_cover,
            MeasurementKind::Precipitation => &mut next.precipitation,
        };
        *slot = Some(point);
        next.last_update_time = now.max(self.last_update_time);
        next
    }

    pub fn has_any_field(&self) -> bool {
        MeasurementKind::ALL
            .iter()
            .any(|kind| self.field(*kind).is_some())
    }

    /// Milliseconds since the UTC epoch.
    pub fn last_update_millis(&self) -> i64 {
        self.last_update_time.timestamp_millis()
    }
}

impl Default for AtmosphericRecord {
    fn default() -> Self {
        Self::empty()
    }
}

// ── Usage report ──────────────────────────────────────────────────────

/// Snapshot of how the store has been queried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyReport {
    /// Airports with at least one reading updated inside the recent window.
    #[serde(rename = "datasize")]
    pub recent_record_count: usize,
    /// Share of all requests per registered airport.
    #[serde(rename = "iata_freq")]
    pub airport_frequency_fraction: BTreeMap<String, f64>,
    /// Request count per integer radius bucket, dense from bucket 0.
    #[serde(rename = "radius_freq")]
    pub radius_histogram: Vec<u64>,
}
