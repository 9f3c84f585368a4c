//! Resource reservation layer.
//!
//! Two hard constraints govern every plan:
//!
//! - [`CapacityLedger`]: seats per flight-date, copy-on-write.
//! - [`OccupancyTracker`]: warehouse units per airport over time, as a
//!   delta timeline validated by prefix sums.
//!
//! [`CapacityState`] pairs them; each candidate plan owns one so candidates
//! never interfere. [`Reservation`] groups holds into an all-or-nothing
//! unit, and [`SharedCapacity`] is the committed state a run starts from
//! and writes its winner back into.

mod ledger;
mod occupancy;
mod reservation;
mod state;

pub use ledger::CapacityLedger;
pub use occupancy::{OccupancyTracker, OccupancyViolation};
pub use reservation::Reservation;
pub use state::{CapacityState, SharedCapacity};
