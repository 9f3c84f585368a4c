//! Capacity state: the ledger/tracker pair, and its shared canonical copy.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use super::{CapacityLedger, OccupancyTracker};
use crate::models::time::utc_to_local;
use crate::models::Network;

/// Seat ledger plus warehouse tracker.
///
/// Every candidate plan owns one; cloning is cheap for the ledger and a
/// timeline copy for the tracker.
#[derive(Debug, Clone, Default)]
pub struct CapacityState {
    pub ledger: CapacityLedger,
    pub tracker: OccupancyTracker,
}

impl CapacityState {
    /// Empty state for `network` (all flights and warehouses free).
    pub fn new(network: &Network) -> Self {
        Self {
            ledger: CapacityLedger::new(),
            tracker: OccupancyTracker::new(network.storage_capacities()),
        }
    }

    /// Replaces both parts with `other`'s.
    pub fn apply_from(&mut self, other: &CapacityState) {
        self.ledger.apply_from(&other.ledger);
        self.tracker.apply_from(&other.tracker);
    }
}

/// The canonical committed capacity state.
///
/// Runs copy it with [`snapshot`](Self::snapshot) and write back exactly
/// once with [`commit`](Self::commit). The lock serialises writers.
#[derive(Debug, Default)]
pub struct SharedCapacity {
    inner: Mutex<CapacityState>,
}

impl SharedCapacity {
    pub fn new(network: &Network) -> Self {
        Self::from_state(CapacityState::new(network))
    }

    pub fn from_state(state: CapacityState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> CapacityState {
        self.inner.lock().clone()
    }

    /// Replaces the canonical state with `state`.
    pub fn commit(&self, state: &CapacityState) {
        self.inner.lock().apply_from(state);
    }

    /// Runs `f` against the current state under the lock.
    pub fn with_state<T>(&self, f: impl FnOnce(&CapacityState) -> T) -> T {
        f(&self.inner.lock())
    }

    /// Drops bookkeeping that `now` has made irrelevant.
    ///
    /// Ledger entries are purged per flight for service dates before the
    /// origin-local date of `now`. Tracker deltas before `now` are folded
    /// into a running balance.
    pub fn advance_to(&self, now: DateTime<Utc>, network: &Network) {
        let mut state = self.inner.lock();
        let before = (state.ledger.len(), state.tracker.len());
        for flight in network.flights() {
            if let Some(origin) = network.airport(&flight.origin) {
                let local_today = utc_to_local(now, origin.offset()).date();
                state.ledger.purge_flight_before(&flight.id, local_today);
            }
        }
        state.tracker.purge_before(now);
        debug!(
            %now,
            ledger_entries = state.ledger.len(),
            ledger_purged = before.0 - state.ledger.len(),
            tracker_events = state.tracker.len(),
            "advanced shared capacity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_network;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_snapshot_is_isolated_until_commit() {
        let network = sample_network();
        let shared = SharedCapacity::new(&network);
        let flight = &network.flights()[0];
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let mut work = shared.snapshot();
        assert!(work.ledger.try_reserve(flight, date, 1));
        assert_eq!(shared.with_state(|s| s.ledger.reserved(flight, date)), 0);

        shared.commit(&work);
        assert_eq!(shared.with_state(|s| s.ledger.reserved(flight, date)), 1);
    }

    #[test]
    fn test_advance_purges_elapsed_dates() {
        let network = sample_network();
        let shared = SharedCapacity::new(&network);
        let flight = &network.flights()[0];
        let old = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let future = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();

        let mut work = shared.snapshot();
        assert!(work.ledger.try_reserve(flight, old, 1));
        assert!(work.ledger.try_reserve(flight, future, 1));
        shared.commit(&work);

        shared.advance_to(Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap(), &network);
        shared.with_state(|s| {
            assert_eq!(s.ledger.reserved(flight, old), 0);
            assert_eq!(s.ledger.reserved(flight, future), 1);
        });
    }
}
