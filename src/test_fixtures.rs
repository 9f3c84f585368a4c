//! Shared fixtures for unit tests.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use crate::config::PlannerConfig;
use crate::models::{Airport, Flight, Network, Order};

pub(crate) fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 2025-01-01T00:00Z.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub(crate) fn order(id: &str, destination: &str, quantity: u32) -> Order {
    Order::new(id, destination, quantity, t0())
}

/// Six airports on three continents.
///
/// ```text
/// SPIM -> SKBO -> SEQM        UBBB -> EBCI -> LOWW
///   \                                   |
///    +-------------> EBCI <-------------+--> SKBO -> SPIM
/// ```
pub(crate) fn sample_network() -> Network {
    let airports = vec![
        Airport::new("SPIM", -5, 1_000, "America del Sur"),
        Airport::new("SKBO", -5, 1_000, "America del Sur"),
        Airport::new("SEQM", -5, 1_000, "America del Sur"),
        Airport::new("EBCI", 1, 1_000, "Europa"),
        Airport::new("LOWW", 1, 1_000, "Europa"),
        Airport::new("UBBB", 4, 1_000, "Asia"),
    ];
    let flights = vec![
        Flight::new("SPIM-SKBO-08:00", "SPIM", "SKBO", hm(8, 0), hm(11, 0), 50),
        Flight::new("SPIM-EBCI-09:00", "SPIM", "EBCI", hm(9, 0), hm(5, 0), 50),
        Flight::new("SKBO-SEQM-13:00", "SKBO", "SEQM", hm(13, 0), hm(14, 30), 40),
        Flight::new("EBCI-LOWW-10:00", "EBCI", "LOWW", hm(10, 0), hm(11, 30), 50),
        Flight::new("UBBB-EBCI-06:00", "UBBB", "EBCI", hm(6, 0), hm(10, 0), 50),
        Flight::new("EBCI-SKBO-12:00", "EBCI", "SKBO", hm(12, 0), hm(17, 0), 30),
        Flight::new("SKBO-SPIM-18:00", "SKBO", "SPIM", hm(18, 0), hm(21, 0), 30),
    ];
    Network::new(airports, flights).unwrap()
}

pub(crate) fn planner_config() -> PlannerConfig {
    PlannerConfig::default()
}
