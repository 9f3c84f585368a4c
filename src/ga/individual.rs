//! Candidate delivery plan.
//!
//! An [`Individual`] assigns every in-scope order to one or more routes and
//! owns the [`CapacityState`] those routes were reserved against, so
//! candidates never see each other's holds.
//!
//! # Construction
//!
//! | Operation | Base state | Routing | On infeasibility |
//! |-----------|-----------|---------|------------------|
//! | [`random`](Individual::random) | run snapshot | exploratory | `Err` |
//! | [`crossover`](Individual::crossover) | parent A | adopt B, else directed | `Err` (caller drops) |
//! | [`mutate`](Individual::mutate) | parent | directed | `Err` (caller drops) |
//! | [`try_insert_orders`](Individual::try_insert_orders) | self | directed | `Ok(None)` |
//!
//! # Fitness
//! Sum over plans of plan slack in minutes. Higher is better.

use chrono::{DateTime, Duration, Utc};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

use super::PlanningContext;
use crate::capacity::{CapacityState, Reservation, SharedCapacity};
use crate::config::PlannerConfig;
use crate::error::{PlanningError, Result};
use crate::models::time::minutes_between;
use crate::models::{AirportCode, Order, OrderId, OrderPlan};
use crate::routing::{RouteBuilder, SelectionMode};

/// One complete candidate plan.
#[derive(Debug, Clone)]
pub struct Individual {
    plans: Vec<OrderPlan>,
    capacity: CapacityState,
    fitness: f64,
}

impl Individual {
    /// Plans every order from scratch on top of `base`.
    ///
    /// Each order tries shuffled production hubs until its full quantity
    /// is routed.
    ///
    /// # Errors
    /// [`PlanningError::Infeasible`] or [`PlanningError::SlaViolated`] for
    /// the first order that cannot be placed on time.
    pub fn random<R: Rng + ?Sized>(
        ctx: &PlanningContext<'_>,
        base: &CapacityState,
        orders: &[Order],
        rng: &mut R,
    ) -> Result<Self> {
        let mut capacity = base.clone();
        let mut plans = Vec::with_capacity(orders.len());
        for order in orders {
            ctx.check_cancelled()?;
            plans.push(build_plan(
                ctx,
                &mut capacity,
                order,
                SelectionMode::Exploratory,
                &[],
                rng,
            )?);
        }
        Ok(Self::assemble(plans, capacity))
    }

    /// Breeds a child from `parent_a`, revising a `fraction` of the orders.
    ///
    /// For each revised order A's holds are released, then B's plan is
    /// re-reserved as is. If that fails or arrives late the order is
    /// rebuilt in directed mode, trying B's hubs, then A's, then the rest.
    pub fn crossover<R: Rng + ?Sized>(
        ctx: &PlanningContext<'_>,
        parent_a: &Individual,
        parent_b: &Individual,
        orders: &[Order],
        fraction: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let mut child = parent_a.clone();
        for order in select_orders(orders, fraction, rng) {
            ctx.check_cancelled()?;
            let slot = child.position(&order.id);
            let a_hubs = slot.map(|i| child.plans[i].origins()).unwrap_or_default();
            if let Some(i) = slot {
                release_plan(ctx, &mut child.capacity, &child.plans[i])?;
            }

            let b_plan = parent_b.plan_for(&order.id);
            let adopted = match b_plan {
                Some(plan) => try_adopt_plan(ctx, &mut child.capacity, order, plan)?,
                None => None,
            };
            let plan = match adopted {
                Some(plan) => plan,
                None => {
                    let b_hubs = b_plan.map(OrderPlan::origins).unwrap_or_default();
                    build_plan(
                        ctx,
                        &mut child.capacity,
                        order,
                        SelectionMode::Directed,
                        &[b_hubs, a_hubs],
                        rng,
                    )?
                }
            };
            child.put_plan(slot, plan);
        }
        child.evaluate();
        Ok(child)
    }

    /// Rebuilds a `fraction` of `parent`'s orders in directed mode,
    /// trying the hubs each order already used first.
    pub fn mutate<R: Rng + ?Sized>(
        ctx: &PlanningContext<'_>,
        parent: &Individual,
        orders: &[Order],
        fraction: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let mut child = parent.clone();
        for order in select_orders(orders, fraction, rng) {
            ctx.check_cancelled()?;
            let slot = child.position(&order.id);
            let own_hubs = slot.map(|i| child.plans[i].origins()).unwrap_or_default();
            if let Some(i) = slot {
                release_plan(ctx, &mut child.capacity, &child.plans[i])?;
            }
            let plan = build_plan(
                ctx,
                &mut child.capacity,
                order,
                SelectionMode::Directed,
                &[own_hubs],
                rng,
            )?;
            child.put_plan(slot, plan);
        }
        child.evaluate();
        Ok(child)
    }

    /// Extends a copy of this plan with `new_orders`, leaving existing
    /// plans and holds untouched. Orders already planned are skipped.
    ///
    /// # Returns
    /// `Ok(None)` if any new order cannot be placed on time. `Err` only for
    /// cancellation, unknown references or broken invariants.
    pub fn try_insert_orders<R: Rng + ?Sized>(
        &self,
        ctx: &PlanningContext<'_>,
        new_orders: &[Order],
        rng: &mut R,
    ) -> Result<Option<Self>> {
        let mut child = self.clone();
        for order in new_orders {
            if child.position(&order.id).is_some() {
                continue;
            }
            ctx.check_cancelled()?;
            match build_plan(
                ctx,
                &mut child.capacity,
                order,
                SelectionMode::Directed,
                &[],
                rng,
            ) {
                Ok(plan) => child.plans.push(plan),
                Err(e) if e.is_infeasibility() => {
                    debug!(order = %order.id, error = %e, "order insertion failed");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
        child.evaluate();
        Ok(Some(child))
    }

    /// Commits this plan's capacity state as the canonical one.
    pub fn apply_to(&self, shared: &SharedCapacity) {
        shared.commit(&self.capacity);
    }

    /// Capacity state with every plan of this individual released: the
    /// holds it was built on top of.
    pub fn base_capacity(&self, ctx: &PlanningContext<'_>) -> Result<CapacityState> {
        let mut base = self.capacity.clone();
        for plan in &self.plans {
            release_plan(ctx, &mut base, plan)?;
        }
        Ok(base)
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn plans(&self) -> &[OrderPlan] {
        &self.plans
    }

    pub fn plan_for(&self, order_id: &str) -> Option<&OrderPlan> {
        self.plans.iter().find(|p| p.order_id.as_ref() == order_id)
    }

    pub fn capacity(&self) -> &CapacityState {
        &self.capacity
    }

    /// Delivery instant per order: latest final arrival plus dwell, or
    /// creation plus dwell for zero-hop plans.
    pub fn completion_times(
        &self,
        config: &PlannerConfig,
        orders: &[Order],
    ) -> HashMap<OrderId, DateTime<Utc>> {
        let dwell = config.warehouse_dwell();
        orders
            .iter()
            .filter_map(|order| {
                let plan = self.plan_for(&order.id)?;
                let done = plan
                    .routes
                    .iter()
                    .map(|r| r.final_arrival().unwrap_or(order.created_at) + dwell)
                    .max()
                    .unwrap_or(order.created_at + dwell);
                Some((order.id.clone(), done))
            })
            .collect()
    }

    fn assemble(plans: Vec<OrderPlan>, capacity: CapacityState) -> Self {
        let mut individual = Self {
            plans,
            capacity,
            fitness: 0.0,
        };
        individual.evaluate();
        individual
    }

    fn evaluate(&mut self) {
        self.fitness = self.plans.iter().map(|p| p.slack_minutes as f64).sum();
    }

    fn position(&self, order_id: &str) -> Option<usize> {
        self.plans.iter().position(|p| p.order_id.as_ref() == order_id)
    }

    fn put_plan(&mut self, slot: Option<usize>, plan: OrderPlan) {
        match slot {
            Some(i) => self.plans[i] = plan,
            None => self.plans.push(plan),
        }
    }
}

/// Picks `floor(len × fraction)` orders, at least one unless `fraction`
/// is zero, kept in input order.
fn select_orders<'o, R: Rng + ?Sized>(
    orders: &'o [Order],
    fraction: f64,
    rng: &mut R,
) -> Vec<&'o Order> {
    let count = if fraction > 0.0 {
        (((orders.len() as f64) * fraction).floor() as usize).max(1)
    } else {
        0
    };
    let mut picked = index::sample(rng, orders.len(), count.min(orders.len())).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| &orders[i]).collect()
}

/// Hubs for one round: each preferred group shuffled, then the remaining
/// production hubs shuffled.
fn hub_round<R: Rng + ?Sized>(
    config: &PlannerConfig,
    preferred: &[Vec<AirportCode>],
    rng: &mut R,
) -> Vec<AirportCode> {
    let mut round: Vec<AirportCode> = Vec::new();
    for group in preferred.iter().chain(std::iter::once(&config.production_hubs)) {
        let start = round.len();
        for hub in group {
            if !round.contains(hub) {
                round.push(hub.clone());
            }
        }
        round[start..].shuffle(rng);
    }
    round
}

/// Routes the full quantity of `order`, finalizes slack and rejects late
/// plans. On failure every hold placed here is released.
fn build_plan<R: Rng + ?Sized>(
    ctx: &PlanningContext<'_>,
    state: &mut CapacityState,
    order: &Order,
    mode: SelectionMode,
    preferred: &[Vec<AirportCode>],
    rng: &mut R,
) -> Result<OrderPlan> {
    let mut plan = OrderPlan::new(order.id.clone());
    let mut remaining = order.quantity;
    // Exploratory rounds differ from one another; directed ones don't.
    let retries = match mode {
        SelectionMode::Exploratory => ctx.config.production_hubs.len(),
        SelectionMode::Directed => 0,
    };
    let mut failed_rounds = 0;

    while remaining > 0 {
        let mut built = None;
        for hub in hub_round(ctx.config, preferred, rng) {
            let attempt = RouteBuilder::new(ctx.network, ctx.config, state, rng, mode)
                .build_route(order, &hub, remaining);
            match attempt {
                Ok(Some(route)) if route.quantity > 0 => {
                    built = Some(route);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    release_plan(ctx, state, &plan)?;
                    return Err(e);
                }
            }
        }
        match built {
            Some(route) => {
                remaining -= route.quantity;
                plan.add_route(route);
                failed_rounds = 0;
            }
            None if failed_rounds < retries => failed_rounds += 1,
            None => {
                release_plan(ctx, state, &plan)?;
                return Err(PlanningError::Infeasible {
                    order_id: order.id.clone(),
                    remaining,
                });
            }
        }
    }

    finalize_slack(ctx, order, &mut plan)?;
    if plan.slack_minutes < 0 {
        release_plan(ctx, state, &plan)?;
        return Err(PlanningError::SlaViolated {
            order_id: order.id.clone(),
            late_minutes: -plan.slack_minutes,
        });
    }
    Ok(plan)
}

/// Re-reserves `plan` exactly as it is. `Ok(None)` (nothing held) if any
/// leg no longer fits or the plan would arrive late.
fn try_adopt_plan(
    ctx: &PlanningContext<'_>,
    state: &mut CapacityState,
    order: &Order,
    plan: &OrderPlan,
) -> Result<Option<OrderPlan>> {
    if plan.planned_quantity() != order.quantity {
        return Ok(None);
    }
    let mut tx = Reservation::begin(state);
    for seg in plan.segments() {
        let flight = ctx.network.require_flight(&seg.flight_id)?;
        let hold_until = seg.arrival_at + ctx.config.hold_after(seg.final_leg);
        if !tx.reserve_hop(flight, seg.date, seg.quantity, seg.arrival_at, hold_until)? {
            return Ok(None);
        }
    }
    let mut adopted = plan.clone();
    finalize_slack(ctx, order, &mut adopted)?;
    if adopted.slack_minutes < 0 {
        tx.rollback()?;
        return Ok(None);
    }
    tx.commit();
    Ok(Some(adopted))
}

/// Returns every hold of `plan` to `state`.
fn release_plan(ctx: &PlanningContext<'_>, state: &mut CapacityState, plan: &OrderPlan) -> Result<()> {
    for seg in plan.segments() {
        let flight = ctx.network.require_flight(&seg.flight_id)?;
        state.ledger.release(flight, seg.date, seg.quantity)?;
        state.tracker.release_transit(
            &seg.destination,
            seg.arrival_at,
            seg.arrival_at + ctx.config.hold_after(seg.final_leg),
            seg.quantity,
        );
    }
    Ok(())
}

/// Rewrites route and plan slack against the longest SLA among the plan's
/// hubs: due − (final arrival + dwell).
fn finalize_slack(ctx: &PlanningContext<'_>, order: &Order, plan: &mut OrderPlan) -> Result<()> {
    let destination = ctx.network.require_airport(&order.destination)?;
    let mut sla = Duration::zero();
    for hub in plan.origins() {
        let origin = ctx.network.require_airport(&hub)?;
        sla = sla.max(ctx.config.sla_between(origin, destination));
    }
    let due = order.effective_due(order.created_at + sla);
    let dwell = ctx.config.warehouse_dwell();

    let mut binding: Option<i64> = None;
    for route in &mut plan.routes {
        let done = route.final_arrival().unwrap_or(order.created_at) + dwell;
        let slack = minutes_between(done, due);
        route.set_slack(slack);
        binding = Some(binding.map_or(slack, |b| b.min(slack)));
    }
    plan.slack_minutes = binding.unwrap_or(0);
    Ok(())
}
