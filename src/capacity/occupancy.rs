//! Airport warehouse occupancy tracker.
//!
//! Occupancy is stored as a sorted timeline of signed deltas keyed by
//! `(instant, airport)`: a reservation of `q` units over `[start, end)`
//! adds `+q` at `start` and `-q` at `end`. The occupancy of an airport at
//! instant `t` is the prefix sum of its deltas up to and including `t`.
//!
//! # Validation
//! A reservation is applied speculatively, then the whole timeline is
//! re-scanned. If any airport's running sum exceeds its storage capacity
//! at any event, the deltas are undone and the reservation is refused.
//! Overlapping reservations of other orders are therefore accounted for.
//!
//! Deltas at the same instant and airport merge into one entry, so
//! back-to-back intervals `[a, b)` and `[b, c)` never overlap. Entries
//! that net to zero are removed.
//!
//! # Complexity
//! O(n) per reservation attempt in the number of stored events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::models::AirportCode;

type Key = (DateTime<Utc>, AirportCode);

/// An instant at which an airport holds more than it can store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyViolation {
    pub airport: AirportCode,
    pub at: DateTime<Utc>,
    pub occupancy: i64,
    pub capacity: u32,
}

/// Per-airport occupancy over time.
///
/// Airports without a registered capacity are unlimited.
#[derive(Debug, Clone, Default)]
pub struct OccupancyTracker {
    capacities: Arc<HashMap<AirportCode, u32>>,
    deltas: BTreeMap<Key, i64>,
}

impl OccupancyTracker {
    /// Creates an empty tracker with the given storage capacities.
    pub fn new(capacities: HashMap<AirportCode, u32>) -> Self {
        Self {
            capacities: Arc::new(capacities),
            deltas: BTreeMap::new(),
        }
    }

    /// Storage capacity of `airport`, `None` if unlimited.
    pub fn capacity_of(&self, airport: &str) -> Option<u32> {
        self.capacities.get(airport).copied()
    }

    /// Holds `quantity` units at `airport` over `[start, end)` if every
    /// airport stays within capacity afterwards. Leaves the tracker
    /// unchanged on refusal.
    pub fn try_reserve_transit(
        &mut self,
        airport: &AirportCode,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        quantity: u32,
    ) -> bool {
        if quantity == 0 {
            return true;
        }
        let q = i64::from(quantity);
        self.add(start, airport, q);
        self.add(end, airport, -q);
        if self.first_violation().is_some() {
            self.add(end, airport, q);
            self.add(start, airport, -q);
            return false;
        }
        true
    }

    /// Removes a hold previously placed with the same arguments.
    pub fn release_transit(
        &mut self,
        airport: &AirportCode,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        quantity: u32,
    ) {
        if quantity == 0 {
            return;
        }
        let q = i64::from(quantity);
        self.add(start, airport, -q);
        self.add(end, airport, q);
    }

    fn add(&mut self, at: DateTime<Utc>, airport: &AirportCode, delta: i64) {
        let key = (at, airport.clone());
        let value = self.deltas.get(&key).copied().unwrap_or(0) + delta;
        if value == 0 {
            self.deltas.remove(&key);
        } else {
            self.deltas.insert(key, value);
        }
    }

    fn first_violation(&self) -> Option<OccupancyViolation> {
        let mut running: HashMap<&AirportCode, i64> = HashMap::new();
        for ((at, airport), delta) in &self.deltas {
            let level = running.entry(airport).or_insert(0);
            *level += delta;
            if let Some(&capacity) = self.capacities.get(airport) {
                if *level > i64::from(capacity) {
                    return Some(OccupancyViolation {
                        airport: airport.clone(),
                        at: *at,
                        occupancy: *level,
                        capacity,
                    });
                }
            }
        }
        None
    }

    /// Units held at `airport` at `instant`.
    pub fn occupied_at(&self, airport: &str, instant: DateTime<Utc>) -> i64 {
        self.deltas
            .iter()
            .take_while(|((at, _), _)| *at <= instant)
            .filter(|((_, code), _)| code.as_ref() == airport)
            .map(|(_, delta)| delta)
            .sum()
    }

    /// Free storage at `airport` at `instant` (`u32::MAX` if unlimited).
    pub fn available_at(&self, airport: &str, instant: DateTime<Utc>) -> u32 {
        match self.capacity_of(airport) {
            Some(capacity) => {
                let free = i64::from(capacity) - self.occupied_at(airport, instant);
                u32::try_from(free.max(0)).unwrap_or(u32::MAX)
            }
            None => u32::MAX,
        }
    }

    /// Highest occupancy `airport` ever reaches.
    pub fn peak_occupancy(&self, airport: &str) -> i64 {
        let mut level = 0i64;
        let mut peak = 0i64;
        for ((_, code), delta) in &self.deltas {
            if code.as_ref() == airport {
                level += delta;
                peak = peak.max(level);
            }
        }
        peak
    }

    /// First over-capacity instant of every airport that has one.
    pub fn violations(&self) -> Vec<OccupancyViolation> {
        let mut running: HashMap<&AirportCode, i64> = HashMap::new();
        let mut found: HashMap<&AirportCode, OccupancyViolation> = HashMap::new();
        for ((at, airport), delta) in &self.deltas {
            let level = running.entry(airport).or_insert(0);
            *level += delta;
            if let Some(&capacity) = self.capacities.get(airport) {
                if *level > i64::from(capacity) && !found.contains_key(airport) {
                    found.insert(
                        airport,
                        OccupancyViolation {
                            airport: airport.clone(),
                            at: *at,
                            occupancy: *level,
                            capacity,
                        },
                    );
                }
            }
        }
        let mut out: Vec<OccupancyViolation> = found.into_values().collect();
        out.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.airport.cmp(&b.airport)));
        out
    }

    /// Drops zero-valued entries of `airport` at or before `instant`.
    pub fn cleanup_until(&mut self, airport: &str, instant: DateTime<Utc>) {
        self.deltas
            .retain(|(at, code), delta| *delta != 0 || *at > instant || code.as_ref() != airport);
    }

    /// Folds every delta before `instant` into one balance entry per
    /// airport at `instant`. Occupancy at and after `instant` is unchanged.
    pub fn purge_before(&mut self, instant: DateTime<Utc>) {
        let mut balances: HashMap<AirportCode, i64> = HashMap::new();
        let later = self.deltas.split_off(&(instant, AirportCode::from("")));
        for ((_, airport), delta) in std::mem::replace(&mut self.deltas, later) {
            *balances.entry(airport).or_insert(0) += delta;
        }
        for (airport, balance) in balances {
            self.add(instant, &airport, balance);
        }
    }

    /// Replaces this tracker's timeline with a copy of `other`'s.
    pub fn apply_from(&mut self, other: &OccupancyTracker) {
        self.capacities = Arc::clone(&other.capacities);
        self.deltas = other.deltas.clone();
    }

    /// Stored `(instant, airport, delta)` events in time order.
    pub fn entries(&self) -> impl Iterator<Item = (DateTime<Utc>, &AirportCode, i64)> {
        self.deltas.iter().map(|((at, code), d)| (*at, code, *d))
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn code(s: &str) -> AirportCode {
        Arc::from(s)
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap()
    }

    fn tracker() -> OccupancyTracker {
        let mut caps = HashMap::new();
        caps.insert(code("SKBO"), 3);
        caps.insert(code("EBCI"), 10);
        OccupancyTracker::new(caps)
    }

    #[test]
    fn test_warehouse_overflow_rejected() {
        let mut t = tracker();
        assert!(t.try_reserve_transit(&code("SKBO"), at(1), at(5), 3));
        let before: Vec<_> = t.entries().map(|(a, c, d)| (a, c.clone(), d)).collect();

        assert!(!t.try_reserve_transit(&code("SKBO"), at(4), at(6), 1));
        let after: Vec<_> = t.entries().map(|(a, c, d)| (a, c.clone(), d)).collect();
        assert_eq!(before, after, "refusal leaves state unchanged");
    }

    #[test]
    fn test_back_to_back_intervals_fit() {
        let mut t = tracker();
        assert!(t.try_reserve_transit(&code("SKBO"), at(1), at(5), 3));
        assert!(t.try_reserve_transit(&code("SKBO"), at(5), at(7), 3));
        assert_eq!(t.peak_occupancy("SKBO"), 3);
        assert_eq!(t.occupied_at("SKBO", at(5)), 3);
        assert_eq!(t.occupied_at("SKBO", at(7)), 0);
    }

    #[test]
    fn test_airports_are_independent() {
        let mut t = tracker();
        assert!(t.try_reserve_transit(&code("SKBO"), at(1), at(5), 3));
        assert!(t.try_reserve_transit(&code("EBCI"), at(2), at(4), 10));
        assert_eq!(t.available_at("SKBO", at(2)), 0);
        assert_eq!(t.available_at("EBCI", at(1)), 10);
        assert_eq!(t.available_at("EBCI", at(3)), 0);
    }

    #[test]
    fn test_unknown_airport_is_unlimited() {
        let mut t = tracker();
        assert!(t.try_reserve_transit(&code("ZZZZ"), at(1), at(2), 1_000_000));
        assert_eq!(t.capacity_of("ZZZZ"), None);
        assert_eq!(t.available_at("ZZZZ", at(1)), u32::MAX);
    }

    #[test]
    fn test_release_restores_empty_state() {
        let mut t = tracker();
        assert!(t.try_reserve_transit(&code("SKBO"), at(1), at(5), 2));
        assert!(t.try_reserve_transit(&code("SKBO"), at(3), at(8), 1));
        t.release_transit(&code("SKBO"), at(1), at(5), 2);
        t.release_transit(&code("SKBO"), at(3), at(8), 1);
        assert!(t.is_empty());
    }

    #[test]
    fn test_purge_before_keeps_running_balance() {
        let mut t = tracker();
        assert!(t.try_reserve_transit(&code("SKBO"), at(1), at(10), 2));
        assert!(t.try_reserve_transit(&code("SKBO"), at(2), at(3), 1));
        t.purge_before(at(5));

        assert_eq!(t.occupied_at("SKBO", at(5)), 2);
        assert_eq!(t.occupied_at("SKBO", at(10)), 0);
        assert_eq!(t.entries().filter(|(a, _, _)| *a < at(5)).count(), 0);
        // Folded balance still blocks overflow
        assert!(!t.try_reserve_transit(&code("SKBO"), at(6), at(7), 2));
        assert!(t.try_reserve_transit(&code("SKBO"), at(6), at(7), 1));
    }

    #[test]
    fn test_violations_report_first_instant() {
        let mut caps = HashMap::new();
        caps.insert(code("SKBO"), 1);
        let mut t = OccupancyTracker::new(caps);
        t.release_transit(&code("SKBO"), at(2), at(1), 2);
        let v = t.violations();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].at, at(1));
        assert_eq!(v[0].occupancy, 2);
        // Any reservation is refused while the timeline is over capacity
        assert!(!t.try_reserve_transit(&code("EBCI"), at(5), at(5) + Duration::hours(1), 1));
    }

    #[test]
    fn test_cleanup_until_keeps_non_zero() {
        let mut t = tracker();
        assert!(t.try_reserve_transit(&code("SKBO"), at(1), at(2), 1));
        t.cleanup_until("SKBO", at(3));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_apply_from_copies_timeline() {
        let mut winner = tracker();
        assert!(winner.try_reserve_transit(&code("EBCI"), at(1), at(2), 4));
        let mut shared = tracker();
        shared.apply_from(&winner);
        assert_eq!(shared.occupied_at("EBCI", at(1)), 4);

        winner.release_transit(&code("EBCI"), at(1), at(2), 4);
        assert_eq!(shared.occupied_at("EBCI", at(1)), 4);
    }
}
