//! Air cargo domain models.
//!
//! Reference data (airports, flights), demand (orders), and the plan types
//! a search produces (order plans made of routes made of flight-date
//! segments).
//!
//! # Time Model
//! Instants are UTC (`DateTime<Utc>`). Flight dates and times-of-day are
//! local to the airport they refer to; see [`time`] for conversions.

mod airport;
mod flight;
mod network;
mod order;
mod plan;
pub mod time;

pub use airport::{Airport, AirportCode};
pub use flight::{Flight, FlightId};
pub use network::Network;
pub use order::{Order, OrderId};
pub use plan::{OrderPlan, Route, RouteSegment};
