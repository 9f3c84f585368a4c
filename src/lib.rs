//! Capacity-constrained air cargo route planning.
//!
//! Plans the delivery of orders from production hubs to destination
//! airports over a daily flight network, respecting per flight-date seat
//! capacity and per airport warehouse capacity, and searches the space of
//! feasible plans with a genetic algorithm that maximises total slack.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Airport`, `Flight`, `Network`, `Order`,
//!   `OrderPlan`, `Route`, `RouteSegment`, and local/UTC time helpers
//! - **`capacity`**: Seat ledger, warehouse occupancy tracker, transactional
//!   reservations, and the shared committed state
//! - **`routing`**: Multi-hop route builder with exploratory and directed
//!   flight selection
//! - **`ga`**: Candidate plans, breeding operators, the generational driver,
//!   and plan KPIs
//! - **`config`**: Planner and GA settings
//! - **`validation`**: Input integrity checks and plan audits
//!
//! # Concurrency
//!
//! Each candidate owns a copy-on-write capacity state, so breeding can run
//! on the rayon pool (`GaConfig::parallel`). Only the winner of a run is
//! written back into the [`SharedCapacity`], under its lock.
//!
//! # References
//!
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and
//!   Machine Learning"
//! - Barnhart, Belobaba & Odoni (2003), "Applications of Operations
//!   Research in the Air Transport Industry"

pub mod capacity;
pub mod config;
pub mod error;
pub mod ga;
pub mod models;
pub mod routing;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use capacity::{CapacityState, SharedCapacity};
pub use config::{GaConfig, PlannerConfig};
pub use error::{CapacityError, PlanningError, Result};
pub use ga::{CancelToken, GeneticPlanner, Individual, PlanKpi, PlanOutcome, StopReason};
pub use models::{Airport, Flight, Network, Order, OrderPlan, Route, RouteSegment};
