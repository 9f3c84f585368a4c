//! Flight model.
//!
//! A flight is a daily-repeating service between two airports with a
//! local departure and arrival time-of-day and a per-day seat capacity.
//! Individual dates can be cancelled.
//!
//! # Arrival Rule
//! Arrival is the local arrival time on the departure date, rolled to the
//! next day when it is not after the local departure time. The resulting
//! instant is further rolled forward while it is not after the departure
//! instant, which covers large eastbound offset jumps.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::time::local_to_utc;
use super::AirportCode;

/// Flight identifier (e.g. `"SPIM-SKBO-08:00"`).
pub type FlightId = Arc<str>;

/// A scheduled daily flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub origin: AirportCode,
    pub destination: AirportCode,
    /// Departure time-of-day in the origin's local time.
    pub departure_local: NaiveTime,
    /// Arrival time-of-day in the destination's local time.
    pub arrival_local: NaiveTime,
    /// Seats (units of cargo) available per flight-date.
    pub daily_capacity: u32,
    /// Dates on which the flight does not operate.
    #[serde(default)]
    pub cancelled_dates: BTreeSet<NaiveDate>,
}

impl Flight {
    /// Creates a flight with no cancellations.
    pub fn new(
        id: impl Into<FlightId>,
        origin: impl Into<AirportCode>,
        destination: impl Into<AirportCode>,
        departure_local: NaiveTime,
        arrival_local: NaiveTime,
        daily_capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
            destination: destination.into(),
            departure_local,
            arrival_local,
            daily_capacity,
            cancelled_dates: BTreeSet::new(),
        }
    }

    /// Builds the conventional `ORIGIN-DEST-HH:MM` identifier.
    pub fn conventional_id(origin: &str, destination: &str, departure_local: NaiveTime) -> String {
        format!("{origin}-{destination}-{}", departure_local.format("%H:%M"))
    }

    /// Marks a date as cancelled.
    pub fn with_cancelled_date(mut self, date: NaiveDate) -> Self {
        self.cancelled_dates.insert(date);
        self
    }

    /// Whether the flight does not operate on `date`.
    #[inline]
    pub fn is_cancelled(&self, date: NaiveDate) -> bool {
        self.cancelled_dates.contains(&date)
    }

    /// Departure instant for the service dated `date` (origin-local date).
    pub fn departure_at(&self, date: NaiveDate, origin_offset: FixedOffset) -> DateTime<Utc> {
        local_to_utc(date.and_time(self.departure_local), origin_offset)
    }

    /// Arrival instant for the service dated `date`.
    pub fn arrival_at(
        &self,
        date: NaiveDate,
        origin_offset: FixedOffset,
        destination_offset: FixedOffset,
    ) -> DateTime<Utc> {
        let departure_local = date.and_time(self.departure_local);
        let mut arrival_local = date.and_time(self.arrival_local);
        if arrival_local <= departure_local {
            arrival_local += Duration::days(1);
        }
        let departure = local_to_utc(departure_local, origin_offset);
        let mut arrival = local_to_utc(arrival_local, destination_offset);
        while arrival <= departure {
            arrival += Duration::days(1);
        }
        arrival
    }
}
