//! Order model.
//!
//! An order asks for `quantity` units to be delivered to a destination
//! airport. The due time normally follows from the SLA of the route that
//! serves it (48h same continent, 72h otherwise, resolved from the route's
//! origin hub); a caller may additionally pin an explicit due time, which
//! then caps the SLA-derived one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AirportCode;

/// Order identifier.
pub type OrderId = Arc<str>;

/// A cargo order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub destination: AirportCode,
    /// Units to deliver (positive).
    pub quantity: u32,
    /// Instant the order was placed.
    pub created_at: DateTime<Utc>,
    /// Explicit due time. `None` = derived from the route SLA.
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates an order whose due time is SLA-derived.
    pub fn new(
        id: impl Into<OrderId>,
        destination: impl Into<AirportCode>,
        quantity: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            quantity,
            created_at,
            due_at: None,
        }
    }

    /// Pins an explicit due time.
    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    /// Effective due time given the SLA-derived candidate.
    #[inline]
    pub fn effective_due(&self, sla_due: DateTime<Utc>) -> DateTime<Utc> {
        match self.due_at {
            Some(explicit) => explicit.min(sla_due),
            None => sla_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_effective_due() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let sla_due = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        let order = Order::new("O1", "SKBO", 5, created);
        assert_eq!(order.effective_due(sla_due), sla_due);

        let tight = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let pinned = order.clone().with_due_at(tight);
        assert_eq!(pinned.effective_due(sla_due), tight);

        let loose = Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap();
        let pinned = order.with_due_at(loose);
        assert_eq!(pinned.effective_due(sla_due), sla_due);
    }
}
