//! Input validation and plan auditing.
//!
//! Input checks run before planning and report every problem at once:
//! - Duplicate airport, flight or order IDs
//! - References to unknown airports
//! - Zero capacities and zero quantities
//! - Flights that land where they depart
//! - Out-of-range UTC offsets
//! - Explicit due times before creation
//! - Production hubs missing from the network
//!
//! [`audit_individual`] re-checks a finished candidate plan against the
//! invariants every committed plan must satisfy. [`audit_holds`] checks
//! that its ledger holds nothing beyond its base and its own segments.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::capacity::CapacityState;
use crate::config::PlannerConfig;
use crate::ga::Individual;
use crate::models::{Airport, Flight, FlightId, Network, Order};
use chrono::NaiveDate;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A flight, order or hub names an airport that doesn't exist.
    UnknownAirport,
    /// An order asks for zero units.
    NonPositiveQuantity,
    /// A flight has no seats or an airport has no storage.
    ZeroCapacity,
    /// A flight's origin and destination are the same airport.
    SelfLoop,
    /// An order is due before it was created.
    DueBeforeCreation,
    /// A configured production hub is not in the network.
    UnknownHub,
    /// An airport's UTC offset is outside -12..=14 hours.
    InvalidOffset,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates airports and flights before they form a [`Network`].
pub fn validate_network(airports: &[Airport], flights: &[Flight]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut codes = HashSet::new();
    for a in airports {
        if !codes.insert(a.code.as_ref()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate airport code: {}", a.code),
            ));
        }
        if !(-12..=14).contains(&a.gmt_offset_hours) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidOffset,
                format!("Airport '{}' has UTC offset {}h", a.code, a.gmt_offset_hours),
            ));
        }
        if a.storage_capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroCapacity,
                format!("Airport '{}' has no storage capacity", a.code),
            ));
        }
    }

    let mut flight_ids = HashSet::new();
    for f in flights {
        if !flight_ids.insert(f.id.as_ref()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate flight ID: {}", f.id),
            ));
        }
        for end in [&f.origin, &f.destination] {
            if !codes.contains(end.as_ref()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownAirport,
                    format!("Flight '{}' references unknown airport '{}'", f.id, end),
                ));
            }
        }
        if f.origin == f.destination {
            errors.push(ValidationError::new(
                ValidationErrorKind::SelfLoop,
                format!("Flight '{}' departs and lands at '{}'", f.id, f.origin),
            ));
        }
        if f.daily_capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroCapacity,
                format!("Flight '{}' has zero daily capacity", f.id),
            ));
        }
    }

    finish(errors)
}

/// Validates a batch of orders against `network`.
pub fn validate_orders(network: &Network, orders: &[Order]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();
    for o in orders {
        if !ids.insert(o.id.as_ref()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate order ID: {}", o.id),
            ));
        }
        if network.airport(&o.destination).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownAirport,
                format!("Order '{}' targets unknown airport '{}'", o.id, o.destination),
            ));
        }
        if o.quantity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveQuantity,
                format!("Order '{}' has zero quantity", o.id),
            ));
        }
        if let Some(due) = o.due_at {
            if due < o.created_at {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DueBeforeCreation,
                    format!("Order '{}' is due before it was created", o.id),
                ));
            }
        }
    }
    finish(errors)
}

/// Checks every configured production hub exists in `network`.
pub fn validate_hubs(network: &Network, config: &PlannerConfig) -> ValidationResult {
    let errors = config
        .production_hubs
        .iter()
        .filter(|hub| network.airport(hub).is_none())
        .map(|hub| {
            ValidationError::new(
                ValidationErrorKind::UnknownHub,
                format!("Production hub '{hub}' is not in the network"),
            )
        })
        .collect();
    finish(errors)
}

/// A broken plan invariant found by [`audit_individual`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (order, flight, or airport).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of plan violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// An order in scope has no plan.
    MissingPlan,
    /// Route quantities don't add up to the order, or a segment carries a
    /// different quantity than its route.
    QuantityMismatch,
    /// A flight-date carries more than its daily capacity.
    SeatCapacityExceeded,
    /// The plan's ledger holds a different number of seats than its base
    /// plus its segments.
    LedgerMismatch,
    /// A warehouse holds more than it can store.
    StorageCapacityExceeded,
    /// The plan arrives after the order's due time.
    NegativeSlack,
    /// Consecutive segments don't connect in place or time.
    BrokenChain,
}

impl Violation {
    fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
        severity: i32,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
            severity,
        }
    }
}

/// Audits `individual` against the orders it is meant to serve.
///
/// Checks quantity conservation, flight-date and warehouse capacities,
/// non-negative slack, and that each route is a connected chain from its
/// hub to the order's destination respecting the transfer buffer.
pub fn audit_individual(
    network: &Network,
    config: &PlannerConfig,
    orders: &[Order],
    individual: &Individual,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seats: HashMap<(FlightId, NaiveDate), u32> = HashMap::new();

    for order in orders {
        let Some(plan) = individual.plan_for(&order.id) else {
            violations.push(Violation::new(
                ViolationType::MissingPlan,
                order.id.as_ref(),
                format!("Order '{}' has no plan", order.id),
                100,
            ));
            continue;
        };

        if plan.planned_quantity() != order.quantity {
            violations.push(Violation::new(
                ViolationType::QuantityMismatch,
                order.id.as_ref(),
                format!(
                    "Order '{}' plans {} of {} units",
                    order.id,
                    plan.planned_quantity(),
                    order.quantity
                ),
                100,
            ));
        }
        if plan.slack_minutes < 0 {
            violations.push(Violation::new(
                ViolationType::NegativeSlack,
                order.id.as_ref(),
                format!("Order '{}' is {} minutes late", order.id, -plan.slack_minutes),
                80,
            ));
        }

        for route in &plan.routes {
            let mut at = route.origin.clone();
            let mut ready = None;
            for seg in &route.segments {
                if seg.quantity != route.quantity {
                    violations.push(Violation::new(
                        ViolationType::QuantityMismatch,
                        seg.flight_id.as_ref(),
                        format!(
                            "Segment on '{}' carries {} but its route carries {}",
                            seg.flight_id, seg.quantity, route.quantity
                        ),
                        100,
                    ));
                }
                let on_time = ready.map_or(true, |r| seg.departure_at >= r);
                if seg.origin != at || !on_time {
                    violations.push(Violation::new(
                        ViolationType::BrokenChain,
                        order.id.as_ref(),
                        format!(
                            "Order '{}' boards '{}' at {} without connecting",
                            order.id, seg.flight_id, seg.origin
                        ),
                        70,
                    ));
                }
                *seats
                    .entry((seg.flight_id.clone(), seg.date))
                    .or_insert(0) += seg.quantity;
                at = seg.destination.clone();
                ready = Some(seg.arrival_at + config.transfer_buffer());
            }
            if at != order.destination {
                violations.push(Violation::new(
                    ViolationType::BrokenChain,
                    order.id.as_ref(),
                    format!("Order '{}' has a route ending at {}", order.id, at),
                    70,
                ));
            }
        }
    }

    let state = individual.capacity();
    let mut booked: Vec<_> = seats.into_iter().collect();
    booked.sort();
    for ((flight_id, date), used) in booked {
        let Some(flight) = network.flight(&flight_id) else {
            violations.push(Violation::new(
                ViolationType::BrokenChain,
                flight_id.as_ref(),
                format!("Unknown flight '{flight_id}'"),
                70,
            ));
            continue;
        };
        if used > flight.daily_capacity {
            violations.push(Violation::new(
                ViolationType::SeatCapacityExceeded,
                flight_id.as_ref(),
                format!(
                    "Flight '{flight_id}' on {date} carries {used} of {}",
                    flight.daily_capacity
                ),
                90,
            ));
        }
        let held = state.ledger.reserved(flight, date);
        if held < used {
            violations.push(Violation::new(
                ViolationType::LedgerMismatch,
                flight_id.as_ref(),
                format!("Flight '{flight_id}' on {date} uses {used} seats but holds {held}"),
                90,
            ));
        }
    }

    for v in state.tracker.violations() {
        violations.push(Violation::new(
            ViolationType::StorageCapacityExceeded,
            v.airport.as_ref(),
            format!(
                "Airport '{}' holds {} of {} at {}",
                v.airport, v.occupancy, v.capacity, v.at
            ),
            90,
        ));
    }

    violations
}

/// Checks that every seat `individual` holds is either in `base` or used
/// by one of its own segments.
///
/// Catches holds booked twice for the same order, which
/// [`audit_individual`] cannot see since it only knows the plans.
pub fn audit_holds(
    network: &Network,
    base: &CapacityState,
    individual: &Individual,
) -> Vec<Violation> {
    let mut used: HashMap<(FlightId, NaiveDate), u32> = HashMap::new();
    for seg in individual.plans().iter().flat_map(|p| p.segments()) {
        *used.entry((seg.flight_id.clone(), seg.date)).or_insert(0) += seg.quantity;
    }
    let mut keys: HashSet<(FlightId, NaiveDate)> = used.keys().cloned().collect();
    keys.extend(
        individual
            .capacity()
            .ledger
            .entries()
            .map(|(id, date, _)| (id.clone(), date)),
    );
    let mut keys: Vec<_> = keys.into_iter().collect();
    keys.sort();

    let mut violations = Vec::new();
    for (flight_id, date) in keys {
        let Some(flight) = network.flight(&flight_id) else {
            continue;
        };
        let held = individual.capacity().ledger.reserved(flight, date);
        let expected = base.ledger.reserved(flight, date)
            + used.get(&(flight_id.clone(), date)).copied().unwrap_or(0);
        if held != expected {
            violations.push(Violation::new(
                ViolationType::LedgerMismatch,
                flight_id.as_ref(),
                format!("Flight '{flight_id}' on {date} holds {held} seats, expected {expected}"),
                90,
            ));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{hm, sample_network, t0};

    #[test]
    fn test_valid_network() {
        let airports = vec![
            Airport::new("AAAA", 0, 10, "X"),
            Airport::new("BBBB", 2, 10, "X"),
        ];
        let flights = vec![Flight::new("F1", "AAAA", "BBBB", hm(8, 0), hm(9, 0), 5)];
        assert!(validate_network(&airports, &flights).is_ok());
    }

    #[test]
    fn test_network_problems_are_all_reported() {
        let airports = vec![
            Airport::new("AAAA", 0, 10, "X"),
            Airport::new("AAAA", 0, 10, "X"),
            Airport::new("CCCC", 20, 0, "X"),
        ];
        let flights = vec![
            Flight::new("F1", "AAAA", "AAAA", hm(8, 0), hm(9, 0), 5),
            Flight::new("F1", "AAAA", "ZZZZ", hm(8, 0), hm(9, 0), 0),
        ];
        let errs = validate_network(&airports, &flights).unwrap_err();
        let kinds: HashSet<_> = errs.iter().map(|e| e.kind).collect();
        for kind in [
            ValidationErrorKind::DuplicateId,
            ValidationErrorKind::InvalidOffset,
            ValidationErrorKind::ZeroCapacity,
            ValidationErrorKind::SelfLoop,
            ValidationErrorKind::UnknownAirport,
        ] {
            assert!(kinds.contains(&kind), "missing {kind:?}");
        }
    }

    #[test]
    fn test_order_validation() {
        let network = sample_network();
        let ok = Order::new("O1", "SKBO", 5, t0());
        assert!(validate_orders(&network, &[ok.clone()]).is_ok());

        let orders = vec![
            ok.clone(),
            ok.clone(),
            Order::new("O2", "XXXX", 0, t0()),
            Order::new("O3", "SKBO", 1, t0()).with_due_at(t0() - chrono::Duration::hours(1)),
        ];
        let errs = validate_orders(&network, &orders).unwrap_err();
        let kinds: Vec<_> = errs.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&ValidationErrorKind::DuplicateId));
        assert!(kinds.contains(&ValidationErrorKind::UnknownAirport));
        assert!(kinds.contains(&ValidationErrorKind::NonPositiveQuantity));
        assert!(kinds.contains(&ValidationErrorKind::DueBeforeCreation));
    }

    #[test]
    fn test_audit_clean_plan() {
        use crate::capacity::CapacityState;
        use crate::ga::PlanningContext;
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        let network = sample_network();
        let config = PlannerConfig::default();
        let ctx = PlanningContext::new(&network, &config);
        let orders = vec![
            Order::new("O1", "SKBO", 60, t0()),
            Order::new("O2", "LOWW", 20, t0()),
        ];
        let mut rng = SmallRng::seed_from_u64(42);
        let ind =
            Individual::random(&ctx, &CapacityState::new(&network), &orders, &mut rng).unwrap();
        assert!(audit_individual(&network, &config, &orders, &ind).is_empty());

        // An order outside the plan is reported, nothing else
        let mut wider = orders.clone();
        wider.push(Order::new("O3", "SEQM", 1, t0()));
        let violations = audit_individual(&network, &config, &wider, &ind);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::MissingPlan);
        assert_eq!(violations[0].entity_id, "O3");
    }

    #[test]
    fn test_audit_holds_flags_unused_seats() {
        use crate::capacity::CapacityState;
        use crate::ga::PlanningContext;
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        let network = sample_network();
        let config = PlannerConfig::default().with_production_hubs(["SPIM"]);
        let ctx = PlanningContext::new(&network, &config);
        let empty = CapacityState::new(&network);
        let orders = vec![Order::new("O1", "SKBO", 10, t0())];
        let mut rng = SmallRng::seed_from_u64(42);
        let ind = Individual::random(&ctx, &empty, &orders, &mut rng).unwrap();
        assert!(audit_holds(&network, &empty, &ind).is_empty());

        // Built on a base that already holds seats: clean against that base,
        // but the extra seats show up against an empty one
        let mut busy = CapacityState::new(&network);
        let flight = network.flight("SKBO-SPIM-18:00").unwrap();
        let date = t0().date_naive();
        assert!(busy.ledger.try_reserve(flight, date, 7));
        let on_busy = Individual::random(&ctx, &busy, &orders, &mut rng).unwrap();
        assert!(audit_holds(&network, &busy, &on_busy).is_empty());
        assert!(audit_individual(&network, &config, &orders, &on_busy).is_empty());
        let violations = audit_holds(&network, &empty, &on_busy);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::LedgerMismatch);
        assert_eq!(violations[0].entity_id, "SKBO-SPIM-18:00");
    }

    #[test]
    fn test_hub_validation() {
        let network = sample_network();
        let config = PlannerConfig::default().with_production_hubs(["SPIM", "NOPE"]);
        let errs = validate_hubs(&network, &config).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ValidationErrorKind::UnknownHub);
    }
}
