//! Flight-date seat ledger.
//!
//! Tracks remaining seats per (flight, date). Entries only exist for
//! flight-dates that have been partially booked; an absent entry means the
//! full daily capacity is available.
//!
//! # Copy-on-Write
//! The map lives behind an `Arc`. Cloning a ledger is O(1); the first
//! mutation of a clone materialises a private copy (`Arc::make_mut`).
//! Failed reservations never trigger that copy.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CapacityError;
use crate::models::{Flight, FlightId};

type Key = (FlightId, NaiveDate);

/// Remaining seat capacity per flight-date.
#[derive(Debug, Clone, Default)]
pub struct CapacityLedger {
    remaining: Arc<HashMap<Key, u32>>,
}

impl CapacityLedger {
    /// Creates an empty ledger (every flight-date at full capacity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats still available on `flight` for `date`.
    ///
    /// Cancellation is not reflected here; [`try_reserve`](Self::try_reserve)
    /// rejects cancelled dates.
    pub fn remaining_capacity(&self, flight: &Flight, date: NaiveDate) -> u32 {
        self.remaining
            .get(&(flight.id.clone(), date))
            .copied()
            .unwrap_or(flight.daily_capacity)
    }

    /// Seats booked on `flight` for `date`.
    pub fn reserved(&self, flight: &Flight, date: NaiveDate) -> u32 {
        flight.daily_capacity - self.remaining_capacity(flight, date).min(flight.daily_capacity)
    }

    /// Books `quantity` seats if available. Returns `false` (no change) if
    /// the flight is cancelled on `date` or too few seats remain.
    pub fn try_reserve(&mut self, flight: &Flight, date: NaiveDate, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }
        if flight.is_cancelled(date) {
            return false;
        }
        let available = self.remaining_capacity(flight, date);
        if available < quantity {
            return false;
        }
        self.store(flight, date, available - quantity);
        true
    }

    /// Returns `quantity` seats to `flight` on `date`.
    ///
    /// # Errors
    /// [`CapacityError::OverRelease`] if the result would exceed the daily
    /// capacity, i.e. more is released than was ever reserved. The ledger
    /// is left unchanged in that case.
    pub fn release(
        &mut self,
        flight: &Flight,
        date: NaiveDate,
        quantity: u32,
    ) -> Result<(), CapacityError> {
        if quantity == 0 {
            return Ok(());
        }
        let available = self.remaining_capacity(flight, date);
        let updated = available
            .checked_add(quantity)
            .filter(|&u| u <= flight.daily_capacity)
            .ok_or_else(|| CapacityError::OverRelease {
                flight_id: flight.id.clone(),
                date,
                quantity,
                capacity: flight.daily_capacity,
            })?;
        self.store(flight, date, updated);
        Ok(())
    }

    fn store(&mut self, flight: &Flight, date: NaiveDate, remaining: u32) {
        let map = Arc::make_mut(&mut self.remaining);
        let key = (flight.id.clone(), date);
        if remaining == flight.daily_capacity {
            map.remove(&key);
        } else {
            map.insert(key, remaining);
        }
    }

    /// Drops entries dated before `date`.
    pub fn purge_before(&mut self, date: NaiveDate) {
        if self.remaining.keys().any(|(_, d)| *d < date) {
            Arc::make_mut(&mut self.remaining).retain(|(_, d), _| *d >= date);
        }
    }

    /// Drops entries of one flight dated before `date`.
    pub fn purge_flight_before(&mut self, flight_id: &str, date: NaiveDate) {
        let stale = |(id, d): &Key| id.as_ref() == flight_id && *d < date;
        if self.remaining.keys().any(stale) {
            Arc::make_mut(&mut self.remaining).retain(|k, _| !stale(k));
        }
    }

    /// Replaces this ledger's contents with `other`'s (shared until written).
    pub fn apply_from(&mut self, other: &CapacityLedger) {
        self.remaining = Arc::clone(&other.remaining);
    }

    /// Booked flight-dates as `(flight, date, remaining)`.
    pub fn entries(&self) -> impl Iterator<Item = (&FlightId, NaiveDate, u32)> {
        self.remaining.iter().map(|((id, d), r)| (id, *d, *r))
    }

    /// Number of partially booked flight-dates.
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Whether both ledgers still share the same underlying map.
    pub fn shares_storage_with(&self, other: &CapacityLedger) -> bool {
        Arc::ptr_eq(&self.remaining, &other.remaining)
    }
}
