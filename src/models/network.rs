//! Flight network.
//!
//! Read-only index over airports and flights, shared by every candidate
//! plan for the duration of a run. Holds the departure lists and the
//! reverse adjacency (destination → origins) used for hop-distance
//! estimates.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, VecDeque};

use super::{Airport, AirportCode, Flight, FlightId};
use crate::error::{PlanningError, Result};
use crate::validation::validate_network;

/// Indexed airports and flights.
#[derive(Debug, Clone)]
pub struct Network {
    airports: HashMap<AirportCode, Airport>,
    flights: Vec<Flight>,
    flight_index: HashMap<FlightId, usize>,
    departures: HashMap<AirportCode, Vec<usize>>,
    reverse_graph: HashMap<AirportCode, Vec<AirportCode>>,
}

impl Network {
    /// Builds the network after validating its structure.
    ///
    /// # Errors
    /// [`PlanningError::InvalidInput`] on duplicate IDs, unknown airport
    /// references, zero capacities or self-loops.
    pub fn new(airports: Vec<Airport>, flights: Vec<Flight>) -> Result<Self> {
        validate_network(&airports, &flights).map_err(PlanningError::InvalidInput)?;

        let airports: HashMap<AirportCode, Airport> = airports
            .into_iter()
            .map(|a| (a.code.clone(), a))
            .collect();

        let mut flight_index = HashMap::with_capacity(flights.len());
        let mut departures: HashMap<AirportCode, Vec<usize>> = HashMap::new();
        let mut reverse_graph: HashMap<AirportCode, Vec<AirportCode>> = HashMap::new();
        for (idx, flight) in flights.iter().enumerate() {
            flight_index.insert(flight.id.clone(), idx);
            departures.entry(flight.origin.clone()).or_default().push(idx);
            let origins = reverse_graph.entry(flight.destination.clone()).or_default();
            if !origins.contains(&flight.origin) {
                origins.push(flight.origin.clone());
            }
        }

        Ok(Self {
            airports,
            flights,
            flight_index,
            departures,
            reverse_graph,
        })
    }

    pub fn airport(&self, code: &str) -> Option<&Airport> {
        self.airports.get(code)
    }

    /// Like [`airport`](Self::airport) but reports unknown codes.
    pub fn require_airport(&self, code: &AirportCode) -> Result<&Airport> {
        self.airports
            .get(code)
            .ok_or_else(|| PlanningError::UnknownAirport(code.clone()))
    }

    pub fn airports(&self) -> impl Iterator<Item = &Airport> {
        self.airports.values()
    }

    pub fn flight(&self, id: &str) -> Option<&Flight> {
        self.flight_index.get(id).map(|&i| &self.flights[i])
    }

    /// Like [`flight`](Self::flight) but reports unknown IDs.
    pub fn require_flight(&self, id: &FlightId) -> Result<&Flight> {
        self.flight(id)
            .ok_or_else(|| PlanningError::UnknownFlight(id.clone()))
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    /// Flights leaving `code`, in input order.
    pub fn departures_from<'a>(&'a self, code: &str) -> impl Iterator<Item = &'a Flight> + 'a {
        self.departures
            .get(code)
            .into_iter()
            .flat_map(move |idxs| idxs.iter().map(move |&i| &self.flights[i]))
    }

    /// Storage capacity per airport.
    pub fn storage_capacities(&self) -> HashMap<AirportCode, u32> {
        self.airports
            .values()
            .map(|a| (a.code.clone(), a.storage_capacity))
            .collect()
    }

    /// Breadth-first hop distance from every airport that can reach `target`.
    ///
    /// Airports that cannot reach `target` are absent from the map.
    pub fn hop_distances_to(&self, target: &AirportCode) -> HashMap<AirportCode, u32> {
        let mut distances = HashMap::new();
        let mut queue = VecDeque::new();
        distances.insert(target.clone(), 0u32);
        queue.push_back(target.clone());
        while let Some(current) = queue.pop_front() {
            let base = distances[&current];
            if let Some(origins) = self.reverse_graph.get(&current) {
                for origin in origins {
                    if !distances.contains_key(origin) {
                        distances.insert(origin.clone(), base + 1);
                        queue.push_back(origin.clone());
                    }
                }
            }
        }
        distances
    }

    /// Departure instant of `flight` on `date`.
    pub fn departure_at(&self, flight: &Flight, date: NaiveDate) -> Result<DateTime<Utc>> {
        let origin = self.require_airport(&flight.origin)?;
        Ok(flight.departure_at(date, origin.offset()))
    }

    /// Arrival instant of `flight` on `date`.
    pub fn arrival_at(&self, flight: &Flight, date: NaiveDate) -> Result<DateTime<Utc>> {
        let origin = self.require_airport(&flight.origin)?;
        let destination = self.require_airport(&flight.destination)?;
        Ok(flight.arrival_at(date, origin.offset(), destination.offset()))
    }
}
