//! Multi-hop route search.
//!
//! [`RouteBuilder`] walks the flight graph from a production hub toward an
//! order's destination, booking seats and warehouse space hop by hop
//! through a [`Reservation`](crate::capacity::Reservation) so a failed
//! search leaves no trace. [`SelectionMode`] decides the order in which
//! candidate flights are tried.

mod builder;
mod selection;

pub use builder::RouteBuilder;
pub use selection::{RankInputs, SelectionMode};
