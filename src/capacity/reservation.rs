//! Transactional multi-step reservation.
//!
//! A [`Reservation`] wraps a [`CapacityState`] and records every seat and
//! storage hold it places. Holds are kept on [`commit`](Reservation::commit)
//! and undone in reverse order on [`rollback`](Reservation::rollback) or
//! when the guard is dropped uncommitted.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::error;

use super::CapacityState;
use crate::error::CapacityError;
use crate::models::{AirportCode, Flight};

#[derive(Debug)]
enum Step<'n> {
    Seats {
        flight: &'n Flight,
        date: NaiveDate,
        quantity: u32,
    },
    Storage {
        airport: AirportCode,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        quantity: u32,
    },
}

impl Step<'_> {
    fn quantity(&self) -> u32 {
        match self {
            Step::Seats { quantity, .. } | Step::Storage { quantity, .. } => *quantity,
        }
    }
}

fn undo(state: &mut CapacityState, step: &Step<'_>, quantity: u32) -> Result<(), CapacityError> {
    match step {
        Step::Seats { flight, date, .. } => state.ledger.release(flight, *date, quantity),
        Step::Storage {
            airport, start, end, ..
        } => {
            state.tracker.release_transit(airport, *start, *end, quantity);
            Ok(())
        }
    }
}

/// Guard over a sequence of holds that succeed or fail together.
#[derive(Debug)]
pub struct Reservation<'s, 'n> {
    state: &'s mut CapacityState,
    steps: Vec<Step<'n>>,
    done: bool,
}

impl<'s, 'n> Reservation<'s, 'n> {
    pub fn begin(state: &'s mut CapacityState) -> Self {
        Self {
            state,
            steps: Vec::new(),
            done: false,
        }
    }

    /// Read access to the state including holds placed so far.
    pub fn state(&self) -> &CapacityState {
        self.state
    }

    /// Number of recorded holds.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Books `quantity` seats on `flight`/`date` and holds the same
    /// quantity in the destination warehouse over `[arrival, hold_until)`.
    ///
    /// Both holds are placed or neither is. Returns `Ok(false)` when either
    /// resource is short.
    pub fn reserve_hop(
        &mut self,
        flight: &'n Flight,
        date: NaiveDate,
        quantity: u32,
        arrival: DateTime<Utc>,
        hold_until: DateTime<Utc>,
    ) -> Result<bool, CapacityError> {
        if !self.state.ledger.try_reserve(flight, date, quantity) {
            return Ok(false);
        }
        if !self
            .state
            .tracker
            .try_reserve_transit(&flight.destination, arrival, hold_until, quantity)
        {
            self.state.ledger.release(flight, date, quantity)?;
            return Ok(false);
        }
        self.steps.push(Step::Seats {
            flight,
            date,
            quantity,
        });
        self.steps.push(Step::Storage {
            airport: flight.destination.clone(),
            start: arrival,
            end: hold_until,
            quantity,
        });
        Ok(true)
    }

    /// Lowers every recorded hold above `quantity` to `quantity`,
    /// releasing the excess.
    pub fn shrink_to(&mut self, quantity: u32) -> Result<(), CapacityError> {
        for step in &mut self.steps {
            let held = step.quantity();
            if held > quantity {
                undo(self.state, step, held - quantity)?;
                match step {
                    Step::Seats { quantity: q, .. } | Step::Storage { quantity: q, .. } => {
                        *q = quantity
                    }
                }
            }
        }
        Ok(())
    }

    /// Keeps every hold.
    pub fn commit(mut self) {
        self.done = true;
    }

    /// Undoes every hold, newest first.
    pub fn rollback(mut self) -> Result<(), CapacityError> {
        self.done = true;
        self.unwind()
    }

    fn unwind(&mut self) -> Result<(), CapacityError> {
        let mut first_error = None;
        while let Some(step) = self.steps.pop() {
            if let Err(e) = undo(self.state, &step, step.quantity()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Reservation<'_, '_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = self.unwind() {
            error!(error = %e, "reservation rollback failed");
            if cfg!(debug_assertions) && !std::thread::panicking() {
                panic!("reservation rollback failed: {e}");
            }
        }
    }
}
