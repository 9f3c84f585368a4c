//! Read-only inputs shared by every candidate built in a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::error::{PlanningError, Result};
use crate::models::Network;

/// Cooperative cancellation flag.
///
/// Clones share the flag. Planning checks it between generations and
/// between orders.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Network, settings and cancellation flag for candidate construction.
#[derive(Debug, Clone, Copy)]
pub struct PlanningContext<'a> {
    pub network: &'a Network,
    pub config: &'a PlannerConfig,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> PlanningContext<'a> {
    pub fn new(network: &'a Network, config: &'a PlannerConfig) -> Self {
        Self {
            network,
            config,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// `Err(Cancelled)` once the flag is raised.
    #[inline]
    pub fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(PlanningError::Cancelled),
            _ => Ok(()),
        }
    }
}
