//! Per-airport atmospheric records with optimistic merging.
//!
//! Each slot holds an `Arc<AtmosphericRecord>`. A writer reads the current
//! `Arc`, builds the successor record, and swaps it in only if the slot
//! still points at the exact `Arc` it read. Losing that race means another
//! writer got there first, so the cycle starts over from the new value.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::config::RetryConfig;
use common::{AtmosphericRecord, DataPoint, Error, MeasurementKind};
use dashmap::DashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwapOutcome {
    Swapped,
    /// Another writer replaced the record.
    Changed,
    /// The record was deleted.
    Vanished,
}

fn deleted_during_update(iata: &str) -> Error {
    Error::invalid(format!("record for '{iata}' was deleted during the update"))
}

/// Thread-safe store of the latest atmospheric record per airport.
#[derive(Debug, Default)]
pub struct AtmosphericStore {
    records: DashMap<String, Arc<AtmosphericRecord>>,
    retry: RetryConfig,
}

impl AtmosphericStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(retry: RetryConfig) -> Self {
        Self {
            records: DashMap::new(),
            retry,
        }
    }

    /// Replace one field of the record for `iata`.
    ///
    /// The mean is range-checked before anything is written, so a rejected
    /// reading never creates or modifies a record. Airport existence is the
    /// caller's concern. Returns the record that was stored.
    pub fn merge(
        &self,
        iata: &str,
        kind: MeasurementKind,
        point: DataPoint,
    ) -> Result<Arc<AtmosphericRecord>, Error> {
        self.merge_with(iata, kind, point, || {})
    }

    /// `before_swap` runs between building the successor and the swap
    /// attempt. Tests use it to inject a competing writer.
    pub(crate) fn merge_with<F: FnMut()>(
        &self,
        iata: &str,
        kind: MeasurementKind,
        point: DataPoint,
        mut before_swap: F,
    ) -> Result<Arc<AtmosphericRecord>, Error> {
        if !kind.accepts_mean(point.mean) {
            return Err(Error::invalid(format!(
                "{} mean {} is out of range",
                kind, point.mean
            )));
        }

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;

            // Only the first attempt may create the record. A slot missing on
            // a later attempt was deleted by someone else.
            let current = if attempts == 1 {
                self.current_or_insert_empty(iata)
            } else {
                self.get_reading(iata).ok_or_else(|| deleted_during_update(iata))?
            };
            let next = Arc::new(current.with_field(kind, point, Utc::now()));
            before_swap();

            match self.compare_and_swap(iata, &current, Arc::clone(&next)) {
                SwapOutcome::Swapped => {
                    debug!("{}: stored {} after {} attempt(s)", iata, kind, attempts);
                    return Ok(next);
                }
                SwapOutcome::Vanished => {
                    debug!("{}: record deleted while storing {}", iata, kind);
                    return Err(deleted_during_update(iata));
                }
                SwapOutcome::Changed => {}
            }

            if let Some(max_attempts) = self.retry.max_attempts {
                if attempts >= max_attempts {
                    warn!(
                        "{}: giving up on {} update after {} conflicting attempts",
                        iata, kind, attempts
                    );
                    return Err(Error::Contention {
                        iata: iata.to_string(),
                        attempts,
                    });
                }
            }

            debug!("{}: concurrent update detected, retry #{}", iata, attempts);
            std::thread::sleep(self.retry.backoff());
        }
    }

    fn current_or_insert_empty(&self, iata: &str) -> Arc<AtmosphericRecord> {
        if let Some(existing) = self.records.get(iata) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .records
            .entry(iata.to_string())
            .or_insert_with(|| Arc::new(AtmosphericRecord::empty()));
        Arc::clone(entry.value())
    }

    /// Install `next` only if the slot still holds `expected`.
    fn compare_and_swap(
        &self,
        iata: &str,
        expected: &Arc<AtmosphericRecord>,
        next: Arc<AtmosphericRecord>,
    ) -> SwapOutcome {
        match self.records.get_mut(iata) {
            Some(mut slot) if Arc::ptr_eq(slot.value(), expected) => {
                *slot = next;
                SwapOutcome::Swapped
            }
            Some(_) => SwapOutcome::Changed,
            None => SwapOutcome::Vanished,
        }
    }

    /// Remove the record for `iata` only if it is still `stored`.
    pub fn discard(&self, iata: &str, stored: &Arc<AtmosphericRecord>) -> bool {
        self.records
            .remove_if(iata, |_, current| Arc::ptr_eq(current, stored))
            .is_some()
    }

    pub fn get_reading(&self, iata: &str) -> Option<Arc<AtmosphericRecord>> {
        self.records.get(iata).map(|entry| Arc::clone(entry.value()))
    }

    pub fn delete_reading(&self, iata: &str) {
        if self.records.remove(iata).is_some() {
            debug!("{}: atmospheric record removed", iata);
        }
    }

    /// Records with at least one reading updated after `cutoff`.
    pub fn count_recent(&self, cutoff: DateTime<Utc>) -> usize {
        self.records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.has_any_field() && record.last_update_time > cutoff
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
