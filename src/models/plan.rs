//! Plan (solution) model.
//!
//! A plan assigns every unit of an order to one or more routes; a route is
//! a chain of flight-date segments from a production hub to the order's
//! destination.
//!
//! # Quantities
//! Every segment of a route carries exactly the route's quantity, and the
//! route quantities of an [`OrderPlan`] sum to the order quantity.
//!
//! # Slack
//! Slack is due time minus (final arrival + warehouse dwell), in minutes.
//! A route's slack is stored on the route and on its last segment; a plan's
//! slack is the minimum over its routes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AirportCode, FlightId, OrderId};

/// One flight-date leg of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub flight_id: FlightId,
    pub origin: AirportCode,
    pub destination: AirportCode,
    /// Service date (origin-local).
    pub date: NaiveDate,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    /// Units carried on this leg.
    pub quantity: u32,
    /// Whether this leg lands on the order's destination.
    pub final_leg: bool,
    /// Slack in minutes; meaningful on the final leg only.
    pub slack_minutes: i64,
}

/// A hop chain carrying part of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Production hub the route starts from.
    pub origin: AirportCode,
    pub quantity: u32,
    pub segments: Vec<RouteSegment>,
    pub slack_minutes: i64,
}

impl Route {
    /// Creates an empty route from `origin`.
    pub fn new(origin: AirportCode, quantity: u32) -> Self {
        Self {
            origin,
            quantity,
            segments: Vec::new(),
            slack_minutes: 0,
        }
    }

    /// Number of flight legs.
    #[inline]
    pub fn hops(&self) -> usize {
        self.segments.len()
    }

    /// Whether the order's destination is the hub itself (no flights).
    #[inline]
    pub fn is_zero_hop(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last_segment(&self) -> Option<&RouteSegment> {
        self.segments.last()
    }

    /// Final arrival instant, if the route flies at all.
    pub fn final_arrival(&self) -> Option<DateTime<Utc>> {
        self.last_segment().map(|s| s.arrival_at)
    }

    /// Sets the route slack and mirrors it onto the last segment.
    pub fn set_slack(&mut self, slack_minutes: i64) {
        self.slack_minutes = slack_minutes;
        if let Some(last) = self.segments.last_mut() {
            last.slack_minutes = slack_minutes;
        }
    }
}

/// All routes serving one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlan {
    pub order_id: OrderId,
    pub routes: Vec<Route>,
    /// Minimum slack over the routes (binding constraint).
    pub slack_minutes: i64,
}

impl OrderPlan {
    /// Creates an empty plan.
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            routes: Vec::new(),
            slack_minutes: 0,
        }
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Sum of route quantities.
    pub fn planned_quantity(&self) -> u32 {
        self.routes.iter().map(|r| r.quantity).sum()
    }

    /// Hubs used by this plan, in route order, without duplicates.
    pub fn origins(&self) -> Vec<AirportCode> {
        let mut out: Vec<AirportCode> = Vec::new();
        for route in &self.routes {
            if !out.contains(&route.origin) {
                out.push(route.origin.clone());
            }
        }
        out
    }

    /// All segments across all routes.
    pub fn segments(&self) -> impl Iterator<Item = &RouteSegment> {
        self.routes.iter().flat_map(|r| r.segments.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn segment(qty: u32, final_leg: bool) -> RouteSegment {
        RouteSegment {
            flight_id: Arc::from("F1"),
            origin: Arc::from("SPIM"),
            destination: Arc::from("SKBO"),
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            departure_at: Utc.with_ymd_and_hms(2025, 1, 1, 13, 0, 0).unwrap(),
            arrival_at: Utc.with_ymd_and_hms(2025, 1, 1, 16, 0, 0).unwrap(),
            quantity: qty,
            final_leg,
            slack_minutes: 0,
        }
    }

    #[test]
    fn test_set_slack_mirrors_last_segment() {
        let mut route = Route::new(Arc::from("SPIM"), 4);
        route.segments.push(segment(4, true));
        route.set_slack(90);
        assert_eq!(route.slack_minutes, 90);
        assert_eq!(route.last_segment().unwrap().slack_minutes, 90);
        assert_eq!(route.hops(), 1);
        assert!(!route.is_zero_hop());
    }

    #[test]
    fn test_plan_quantity_and_origins() {
        let mut plan = OrderPlan::new(Arc::from("O1"));
        plan.add_route(Route::new(Arc::from("SPIM"), 3));
        plan.add_route(Route::new(Arc::from("EBCI"), 2));
        plan.add_route(Route::new(Arc::from("SPIM"), 5));
        assert_eq!(plan.planned_quantity(), 10);
        let origins = plan.origins();
        let origins: Vec<&str> = origins.iter().map(|c| c.as_ref()).collect();
        assert_eq!(origins, vec!["SPIM", "EBCI"]);
    }
}
