//! Price refresh state machine: at most one fetch in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::valuation::PortfolioValuation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
}

/// Why a sync request did not reach the price service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyLedger,
    AlreadyFetching,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Refreshed(PortfolioValuation),
    Skipped(SkipReason),
}

#[derive(Debug, Default)]
pub struct SyncController {
    fetching: AtomicBool,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        if self.fetching.load(Ordering::Acquire) {
            SyncState::Fetching
        } else {
            SyncState::Idle
        }
    }

    /// Moves to `Fetching` unless a fetch is already in flight. The controller
    /// returns to `Idle` when the guard is dropped, whatever the fetch result.
    pub fn try_begin(&self) -> Option<FetchGuard<'_>> {
        match self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!("Sync state: Idle -> Fetching");
                Some(FetchGuard { controller: self })
            }
            Err(_) => {
                debug!("Fetch already in flight, dropping trigger");
                None
            }
        }
    }
}

#[must_use]
pub struct FetchGuard<'a> {
    controller: &'a SyncController,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.controller.fetching.store(false, Ordering::Release);
        debug!("Sync state: Fetching -> Idle");
    }
}
