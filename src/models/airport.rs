//! Airport model.
//!
//! Airports are immutable reference data: a code, a whole-hour UTC offset,
//! a warehouse storage capacity and a continent. The continent decides the
//! SLA class of a route (same continent vs. intercontinental).

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::time::offset_from_hours;

/// Airport code (ICAO in the reference data, e.g. `"SPIM"`).
pub type AirportCode = Arc<str>;

/// An airport with a cargo warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    /// Unique airport code.
    pub code: AirportCode,
    /// Hours east of UTC (negative = west).
    pub gmt_offset_hours: i32,
    /// Units the warehouse can hold at any instant.
    pub storage_capacity: u32,
    /// Continent name, compared case-insensitively.
    pub continent: String,
}

impl Airport {
    /// Creates an airport.
    pub fn new(
        code: impl Into<AirportCode>,
        gmt_offset_hours: i32,
        storage_capacity: u32,
        continent: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            gmt_offset_hours,
            storage_capacity,
            continent: continent.into(),
        }
    }

    /// Fixed UTC offset of this airport.
    #[inline]
    pub fn offset(&self) -> FixedOffset {
        offset_from_hours(self.gmt_offset_hours)
    }

    /// Whether both airports lie on the same continent.
    pub fn same_continent(&self, other: &Airport) -> bool {
        !self.continent.is_empty() && self.continent.eq_ignore_ascii_case(&other.continent)
    }
}
