//! GA-based delivery plan optimization.
//!
//! Each candidate ([`Individual`]) is a complete, capacity-feasible plan
//! that owns its own copy of the capacity state. Operators rebuild a share
//! of the orders on top of a parent's state, so every child is feasible by
//! construction and no repair step is needed.
//!
//! # Submodules
//!
//! - `context`: read-only inputs and the cancellation flag
//! - `individual`: candidate construction, crossover, mutation, insertion
//! - `driver`: [`GeneticPlanner`], the generational loop
//! - `kpi`: [`PlanKpi`] reporting metrics
//!
//! # Reference
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and
//!   Machine Learning"
//! - Potvin & Bengio (1996), "The Vehicle Routing Problem with Time
//!   Windows Part II: Genetic Search"

mod context;
mod driver;
mod individual;
mod kpi;

pub use context::{CancelToken, PlanningContext};
pub use driver::{GeneticPlanner, PlanOutcome, StopReason};
pub use individual::Individual;
pub use kpi::PlanKpi;
