//! Error types.
//!
//! Two families:
//! - [`CapacityError`]: invariant violations inside the reservation layer.
//!   These indicate a bookkeeping bug and are never clamped away.
//! - [`PlanningError`]: everything a planning run can report, including
//!   infeasibility, bad input, and cancellation.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{AirportCode, FlightId, OrderId};
use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlanningError>;

/// Reservation-layer invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// A release would push remaining seats above the flight's daily capacity.
    #[error(
        "releasing {quantity} seats on flight {flight_id} for {date} exceeds daily capacity {capacity}"
    )]
    OverRelease {
        flight_id: FlightId,
        date: NaiveDate,
        quantity: u32,
        capacity: u32,
    },
}

/// Errors reported by route building, candidate construction and the driver.
#[derive(Debug, Clone, Error)]
pub enum PlanningError {
    /// No hub/route combination could carry the remaining quantity.
    #[error("no feasible route for remaining quantity {remaining} of order {order_id}")]
    Infeasible { order_id: OrderId, remaining: u32 },

    /// A complete plan was found but it arrives after the due time.
    #[error("plan for order {order_id} misses its due time by {late_minutes} minutes")]
    SlaViolated { order_id: OrderId, late_minutes: i64 },

    /// The driver was started without any orders.
    #[error("no orders available for planning")]
    EmptyDemand,

    #[error("unknown airport {0}")]
    UnknownAirport(AirportCode),

    #[error("unknown flight {0}")]
    UnknownFlight(FlightId),

    /// Input failed structural validation.
    #[error("invalid input: {} problem(s), first: {}", .0.len(), .0.first().map(|e| e.message.as_str()).unwrap_or("-"))]
    InvalidInput(Vec<ValidationError>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An external cancellation flag was observed.
    #[error("planning run cancelled")]
    Cancelled,

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

impl PlanningError {
    /// Whether this error only means "this candidate cannot be placed".
    ///
    /// Soft paths (carry-over insertion, breeding) drop the candidate on
    /// these and propagate everything else.
    pub fn is_infeasibility(&self) -> bool {
        matches!(
            self,
            PlanningError::Infeasible { .. } | PlanningError::SlaViolated { .. }
        )
    }

    /// Order that could not be placed, when known.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            PlanningError::Infeasible { order_id, .. }
            | PlanningError::SlaViolated { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}
