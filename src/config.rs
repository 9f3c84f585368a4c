//! Planner and search configuration.
//!
//! Both structs deserialize with `serde` (missing fields take their
//! defaults) and expose `with_*` setters.
//!
//! # Defaults
//!
//! | Setting | Value |
//! |---------|-------|
//! | Same-continent SLA | 48 h |
//! | Intercontinental SLA | 72 h |
//! | Transfer buffer | 30 min |
//! | Warehouse dwell | 120 min |
//! | Max hops / day lookahead | 8 / 7 |
//! | Production hubs | SPIM, EBCI, UBBB |
//! | Population / generations | 40 / 80 |
//! | Crossover / mutation rate | 0.75 / 0.35 |

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{PlanningError, Result};
use crate::models::{Airport, AirportCode};

/// Routing and SLA settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub continental_sla_hours: i64,
    pub intercontinental_sla_hours: i64,
    /// Minimum ground time between connecting flights.
    pub transfer_buffer_minutes: i64,
    /// Time cargo sits at the destination warehouse before delivery.
    pub warehouse_dwell_minutes: i64,
    pub max_hops: usize,
    /// Days scanned past the ready date for a usable flight-date.
    pub max_day_lookahead: u32,
    /// Airports orders may originate from.
    pub production_hubs: Vec<AirportCode>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            continental_sla_hours: 48,
            intercontinental_sla_hours: 72,
            transfer_buffer_minutes: 30,
            warehouse_dwell_minutes: 120,
            max_hops: 8,
            max_day_lookahead: 7,
            production_hubs: vec![Arc::from("SPIM"), Arc::from("EBCI"), Arc::from("UBBB")],
        }
    }
}

impl PlannerConfig {
    pub fn with_production_hubs<I, S>(mut self, hubs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AirportCode>,
    {
        self.production_hubs = hubs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sla_hours(mut self, continental: i64, intercontinental: i64) -> Self {
        self.continental_sla_hours = continental;
        self.intercontinental_sla_hours = intercontinental;
        self
    }

    pub fn with_transfer_buffer_minutes(mut self, minutes: i64) -> Self {
        self.transfer_buffer_minutes = minutes;
        self
    }

    pub fn with_warehouse_dwell_minutes(mut self, minutes: i64) -> Self {
        self.warehouse_dwell_minutes = minutes;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_max_day_lookahead(mut self, days: u32) -> Self {
        self.max_day_lookahead = days;
        self
    }

    #[inline]
    pub fn transfer_buffer(&self) -> Duration {
        Duration::minutes(self.transfer_buffer_minutes)
    }

    #[inline]
    pub fn warehouse_dwell(&self) -> Duration {
        Duration::minutes(self.warehouse_dwell_minutes)
    }

    /// Warehouse hold after landing: dwell on the final leg, transfer
    /// buffer otherwise.
    #[inline]
    pub fn hold_after(&self, final_leg: bool) -> Duration {
        if final_leg {
            self.warehouse_dwell()
        } else {
            self.transfer_buffer()
        }
    }

    /// SLA for cargo moving from `origin` to `destination`.
    pub fn sla_between(&self, origin: &Airport, destination: &Airport) -> Duration {
        if origin.same_continent(destination) {
            Duration::hours(self.continental_sla_hours)
        } else {
            Duration::hours(self.intercontinental_sla_hours)
        }
    }

    /// Checks the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.production_hubs.is_empty() {
            return Err(PlanningError::InvalidConfig(
                "at least one production hub is required".into(),
            ));
        }
        if self.continental_sla_hours <= 0 || self.intercontinental_sla_hours <= 0 {
            return Err(PlanningError::InvalidConfig("SLA hours must be positive".into()));
        }
        if self.transfer_buffer_minutes <= 0 || self.warehouse_dwell_minutes <= 0 {
            return Err(PlanningError::InvalidConfig(
                "transfer buffer and warehouse dwell must be positive".into(),
            ));
        }
        if self.max_hops == 0 {
            return Err(PlanningError::InvalidConfig("max_hops must be at least 1".into()));
        }
        Ok(())
    }
}

/// Genetic search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    pub population_size: usize,
    pub max_generations: usize,
    /// Probability a child is bred by crossover rather than mutation.
    pub crossover_rate: f64,
    /// Probability a bred child is mutated once more.
    pub mutation_rate: f64,
    pub tournament_size: usize,
    /// Generations without improvement before stopping early.
    pub patience: usize,
    /// Smallest best-fitness gain that counts as improvement.
    pub min_improvement: f64,
    /// Share of orders revised by a crossover.
    pub crossover_fraction: f64,
    /// Share of orders rebuilt by a mutation.
    pub mutation_fraction: f64,
    /// Seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Builds candidates on the rayon pool.
    pub parallel: bool,
    /// Breeding attempts allowed per missing population slot.
    pub max_breeding_attempts_factor: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 40,
            max_generations: 80,
            crossover_rate: 0.75,
            mutation_rate: 0.35,
            tournament_size: 3,
            patience: 3,
            min_improvement: 1e-6,
            crossover_fraction: 0.25,
            mutation_fraction: 0.20,
            seed: None,
            parallel: false,
            max_breeding_attempts_factor: 10,
        }
    }
}

impl GaConfig {
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    pub fn with_rates(mut self, crossover: f64, mutation: f64) -> Self {
        self.crossover_rate = crossover;
        self.mutation_rate = mutation;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the settings are usable.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(PlanningError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {v}"
                )))
            }
        };
        if self.population_size == 0 {
            return Err(PlanningError::InvalidConfig(
                "population_size must be at least 1".into(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(PlanningError::InvalidConfig(
                "tournament_size must be at least 1".into(),
            ));
        }
        if self.max_breeding_attempts_factor == 0 {
            return Err(PlanningError::InvalidConfig(
                "max_breeding_attempts_factor must be at least 1".into(),
            ));
        }
        unit("crossover_rate", self.crossover_rate)?;
        unit("mutation_rate", self.mutation_rate)?;
        unit("crossover_fraction", self.crossover_fraction)?;
        unit("mutation_fraction", self.mutation_fraction)?;
        if self.min_improvement.is_nan() || self.min_improvement < 0.0 {
            return Err(PlanningError::InvalidConfig(
                "min_improvement must be non-negative".into(),
            ));
        }
        Ok(())
    }
}
