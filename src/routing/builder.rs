//! Hop-by-hop route construction.
//!
//! # Algorithm
//!
//! 1. Hub equal to destination: zero-hop route, done.
//! 2. From the hub, cargo is ready at order creation + warehouse dwell.
//! 3. At each hop (at most `max_hops`), rank departures from the current
//!    airport and, per candidate, scan service dates from the ready time's
//!    local date forward (at most `max_day_lookahead` dates) for one that
//!    departs no earlier than the ready time and still has seats.
//! 4. Book `min(carried, seats left)` on the flight and hold the same
//!    quantity at the arrival airport until arrival + dwell (final leg) or
//!    arrival + transfer buffer (connection). If the warehouse is full the
//!    seats are returned and the scan continues.
//! 5. If less was booked than carried, earlier hops shrink to match, so
//!    every segment carries the route quantity.
//! 6. A hop with no usable candidate releases the whole partial route.

use chrono::Days;
use rand::Rng;
use std::collections::HashSet;
use tracing::trace;

use super::{RankInputs, SelectionMode};
use crate::capacity::{CapacityState, Reservation};
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::models::time::{minutes_between, utc_to_local};
use crate::models::{AirportCode, Flight, Network, Order, Route, RouteSegment};

/// Builds routes against one candidate plan's capacity state.
pub struct RouteBuilder<'a, R: Rng + ?Sized> {
    network: &'a Network,
    config: &'a PlannerConfig,
    state: &'a mut CapacityState,
    rng: &'a mut R,
    mode: SelectionMode,
}

impl<'a, R: Rng + ?Sized> RouteBuilder<'a, R> {
    pub fn new(
        network: &'a Network,
        config: &'a PlannerConfig,
        state: &'a mut CapacityState,
        rng: &'a mut R,
        mode: SelectionMode,
    ) -> Self {
        Self {
            network,
            config,
            state,
            rng,
            mode,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Builds and reserves one route carrying up to `quantity` units of
    /// `order` from `hub`.
    ///
    /// The returned route may carry less than `quantity` when a leg was
    /// short of seats. Its slack is the due time minus the final arrival.
    ///
    /// # Returns
    /// `Ok(None)` when no route exists within the hop and day bounds; all
    /// partial holds are released. `Err` only for unknown airports or a
    /// broken capacity invariant.
    pub fn build_route(
        &mut self,
        order: &Order,
        hub: &AirportCode,
        quantity: u32,
    ) -> Result<Option<Route>> {
        let network = self.network;
        let config = self.config;
        let origin = network.require_airport(hub)?;
        let destination = network.require_airport(&order.destination)?;
        let due = order.effective_due(order.created_at + config.sla_between(origin, destination));
        let ready_at_hub = order.created_at + config.warehouse_dwell();

        if hub == &order.destination {
            let mut route = Route::new(hub.clone(), quantity);
            route.set_slack(minutes_between(ready_at_hub, due));
            return Ok(Some(route));
        }
        if quantity == 0 {
            return Ok(None);
        }

        let distances = network.hop_distances_to(&order.destination);
        let mut visited = HashSet::from([hub.clone()]);
        let mut current = hub.clone();
        let mut current_offset = origin.offset();
        let mut ready = ready_at_hub;
        let mut carried = quantity;
        let mut segments: Vec<RouteSegment> = Vec::new();
        let mut tx = Reservation::begin(self.state);

        while current != order.destination && segments.len() < config.max_hops {
            let options: Vec<&Flight> = network.departures_from(&current).collect();
            if options.is_empty() {
                trace!(order = %order.id, airport = %current, "no departures");
                return Ok(None);
            }
            let inputs = RankInputs {
                network,
                target: &order.destination,
                distances: &distances,
                visited: &visited,
            };
            let current_distance = distances.get(&current).copied().unwrap_or(u32::MAX);
            let ranked = self.mode.rank(options, current_distance, &inputs, &mut *self.rng);

            let mut booked = None;
            'candidates: for flight in ranked {
                let final_leg = flight.destination == order.destination;
                let mut date = utc_to_local(ready, current_offset).date();
                for _ in 0..config.max_day_lookahead {
                    let departure = network.departure_at(flight, date)?;
                    if departure >= ready && !flight.is_cancelled(date) {
                        let send = carried.min(tx.state().ledger.remaining_capacity(flight, date));
                        if send > 0 {
                            let arrival = network.arrival_at(flight, date)?;
                            let hold_until = arrival + config.hold_after(final_leg);
                            if tx.reserve_hop(flight, date, send, arrival, hold_until)? {
                                booked = Some((flight, date, departure, arrival, send, final_leg));
                                break 'candidates;
                            }
                        }
                    }
                    match date.checked_add_days(Days::new(1)) {
                        Some(next) => date = next,
                        None => break,
                    }
                }
            }

            let Some((flight, date, departure, arrival, send, final_leg)) = booked else {
                trace!(order = %order.id, airport = %current, hops = segments.len(), "dead end");
                return Ok(None);
            };

            if send < carried {
                tx.shrink_to(send)?;
                for seg in &mut segments {
                    seg.quantity = send;
                }
                carried = send;
            }
            segments.push(RouteSegment {
                flight_id: flight.id.clone(),
                origin: flight.origin.clone(),
                destination: flight.destination.clone(),
                date,
                departure_at: departure,
                arrival_at: arrival,
                quantity: send,
                final_leg,
                slack_minutes: 0,
            });
            current = flight.destination.clone();
            current_offset = network.require_airport(&current)?.offset();
            ready = arrival + config.hold_after(final_leg);
            visited.insert(current.clone());
        }

        if current != order.destination {
            trace!(order = %order.id, hub = %hub, "hop limit reached");
            return Ok(None);
        }
        tx.commit();

        let mut route = Route::new(hub.clone(), carried);
        route.segments = segments;
        if let Some(arrival) = route.final_arrival() {
            route.set_slack(minutes_between(arrival, due));
        }
        Ok(Some(route))
    }
}
