//! Candidate flight ranking.
//!
//! # Modes
//!
//! - **Exploratory**: keep flights that land strictly closer to the target
//!   (or on it); failing that, flights to unvisited airports; failing that,
//!   everything. The kept set is shuffled.
//! - **Directed**: drop flights to visited airports when others exist, then
//!   sort ascending by `10 × hops-to-target + |Δ UTC offset| (h) − 10 if
//!   direct`. Ties keep departure-list order.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::models::{AirportCode, Flight, Network};

/// How the route builder orders candidate flights at each hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Randomised, progress-biased.
    #[default]
    Exploratory,
    /// Deterministic, score-sorted.
    Directed,
}

/// What ranking needs to know about the search so far.
#[derive(Debug, Clone, Copy)]
pub struct RankInputs<'a> {
    pub network: &'a Network,
    pub target: &'a AirportCode,
    /// Hop distance to `target` per airport; absent = unreachable.
    pub distances: &'a HashMap<AirportCode, u32>,
    pub visited: &'a HashSet<AirportCode>,
}

impl RankInputs<'_> {
    fn distance(&self, code: &AirportCode) -> u32 {
        self.distances.get(code).copied().unwrap_or(u32::MAX)
    }

    /// Hours, not seconds: the hop term stays dominant.
    fn offset_gap_hours(&self, code: &AirportCode) -> f64 {
        match (self.network.airport(code), self.network.airport(self.target)) {
            (Some(a), Some(t)) => f64::from((a.gmt_offset_hours - t.gmt_offset_hours).abs()),
            _ => f64::MAX,
        }
    }

    fn score(&self, flight: &Flight) -> f64 {
        let direct_bonus = if &flight.destination == self.target { -10.0 } else { 0.0 };
        f64::from(self.distance(&flight.destination)) * 10.0
            + self.offset_gap_hours(&flight.destination)
            + direct_bonus
    }
}

impl SelectionMode {
    /// Orders `options` (departures from an airport `current_distance`
    /// hops from the target) for trial.
    pub fn rank<'f, R: Rng + ?Sized>(
        self,
        options: Vec<&'f Flight>,
        current_distance: u32,
        inputs: &RankInputs<'_>,
        rng: &mut R,
    ) -> Vec<&'f Flight> {
        match self {
            SelectionMode::Exploratory => {
                let mut kept: Vec<&Flight> = options
                    .iter()
                    .copied()
                    .filter(|f| {
                        &f.destination == inputs.target
                            || inputs.distance(&f.destination) < current_distance
                    })
                    .collect();
                if kept.is_empty() {
                    kept = options
                        .iter()
                        .copied()
                        .filter(|f| !inputs.visited.contains(&f.destination))
                        .collect();
                }
                if kept.is_empty() {
                    kept = options;
                }
                kept.shuffle(rng);
                kept
            }
            SelectionMode::Directed => {
                let fresh: Vec<&Flight> = options
                    .iter()
                    .copied()
                    .filter(|f| !inputs.visited.contains(&f.destination))
                    .collect();
                let mut kept = if fresh.is_empty() { options } else { fresh };
                kept.sort_by(|a, b| inputs.score(a).total_cmp(&inputs.score(b)));
                kept
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_network;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn test_directed_prefers_progress() {
        let network = sample_network();
        let target: AirportCode = Arc::from("LOWW");
        let distances = network.hop_distances_to(&target);
        let visited = HashSet::from([AirportCode::from("SPIM")]);
        let inputs = RankInputs {
            network: &network,
            target: &target,
            distances: &distances,
            visited: &visited,
        };
        let options: Vec<&Flight> = network.departures_from("SPIM").collect();
        let mut rng = SmallRng::seed_from_u64(42);
        let ranked = SelectionMode::Directed.rank(options, distances["SPIM"], &inputs, &mut rng);
        assert_eq!(ranked[0].destination.as_ref(), "EBCI");
    }

    #[test]
    fn test_directed_drops_visited_when_possible() {
        let network = sample_network();
        let target: AirportCode = Arc::from("SEQM");
        let distances = network.hop_distances_to(&target);
        let visited = HashSet::from([AirportCode::from("EBCI"), AirportCode::from("SKBO")]);
        let inputs = RankInputs {
            network: &network,
            target: &target,
            distances: &distances,
            visited: &visited,
        };
        let options: Vec<&Flight> = network.departures_from("SPIM").collect();
        let mut rng = SmallRng::seed_from_u64(42);
        // Both destinations visited: nothing is dropped
        let ranked = SelectionMode::Directed.rank(options, 2, &inputs, &mut rng);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].destination.as_ref(), "SKBO");
    }

    #[test]
    fn test_exploratory_keeps_closer_or_direct() {
        let network = sample_network();
        let target: AirportCode = Arc::from("SEQM");
        let distances = network.hop_distances_to(&target);
        let visited = HashSet::from([AirportCode::from("SPIM")]);
        let inputs = RankInputs {
            network: &network,
            target: &target,
            distances: &distances,
            visited: &visited,
        };
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10 {
            let options: Vec<&Flight> = network.departures_from("SPIM").collect();
            let ranked =
                SelectionMode::Exploratory.rank(options, distances["SPIM"], &inputs, &mut rng);
            assert_eq!(ranked.len(), 1);
            assert_eq!(ranked[0].destination.as_ref(), "SKBO");
        }
    }
}
