//! Delivery plan quality metrics (KPIs).
//!
//! Summarises a finished [`Individual`] for reporting.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Routes | Routes over all plans, zero-hop included |
//! | Split orders | Orders served by more than one route |
//! | Total slack | Sum of plan slack (the GA fitness) |
//! | Min slack | Tightest plan |
//! | On-time rate | Fraction of plans with non-negative slack |
//! | Mean hops | Flight legs per route |
//! | Seat-legs | Sum over segments of units carried |

use super::Individual;

/// Plan performance indicators. Slack values are in minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanKpi {
    pub orders: usize,
    pub routes: usize,
    pub segments: usize,
    /// Orders whose quantity was split over several routes.
    pub split_orders: usize,
    pub total_slack_minutes: i64,
    /// `0` when there are no plans.
    pub min_slack_minutes: i64,
    pub mean_slack_minutes: f64,
    /// Fraction of plans meeting their due time (0.0..1.0).
    pub on_time_rate: f64,
    pub mean_hops: f64,
    /// Seats consumed, counted once per leg flown.
    pub total_seat_legs: u64,
}

impl PlanKpi {
    /// Computes KPIs for every plan held by `individual`.
    pub fn calculate(individual: &Individual) -> Self {
        let plans = individual.plans();
        let mut routes = 0usize;
        let mut segments = 0usize;
        let mut split_orders = 0usize;
        let mut total_slack: i64 = 0;
        let mut min_slack: Option<i64> = None;
        let mut on_time = 0usize;
        let mut seat_legs: u64 = 0;

        for plan in plans {
            routes += plan.routes.len();
            if plan.routes.len() > 1 {
                split_orders += 1;
            }
            total_slack += plan.slack_minutes;
            min_slack = Some(min_slack.map_or(plan.slack_minutes, |m| m.min(plan.slack_minutes)));
            if plan.slack_minutes >= 0 {
                on_time += 1;
            }
            for seg in plan.segments() {
                segments += 1;
                seat_legs += u64::from(seg.quantity);
            }
        }

        let (mean_slack, on_time_rate) = if plans.is_empty() {
            (0.0, 1.0)
        } else {
            let n = plans.len() as f64;
            (total_slack as f64 / n, on_time as f64 / n)
        };
        let mean_hops = if routes == 0 {
            0.0
        } else {
            segments as f64 / routes as f64
        };

        Self {
            orders: plans.len(),
            routes,
            segments,
            split_orders,
            total_slack_minutes: total_slack,
            min_slack_minutes: min_slack.unwrap_or(0),
            mean_slack_minutes: mean_slack,
            on_time_rate,
            mean_hops,
            total_seat_legs: seat_legs,
        }
    }

    /// Whether every plan keeps at least `min_slack_minutes` of margin.
    pub fn meets_slack(&self, min_slack_minutes: i64) -> bool {
        self.min_slack_minutes >= min_slack_minutes
    }
}
