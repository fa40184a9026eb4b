//! Store invariants
//!
//! The ledger shape already rules out two in-flight (or two pending)
//! updates per handle. The checks here cover what the types cannot:
//!
//! 1. **Pending implies busy** - a pending update always waits behind an
//!    in-flight one for the same handle
//! 2. **View is a projection** - the held view equals a fresh replay of the
//!    active updates over the snapshot
//!
//! Harnesses call these after every step of long random sequences.

use thiserror::Error;

use optimist_core::{HandleId, MutationExecutor, UpdateFn};

use crate::{ReconciliationStore, UpdateLedger};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerViolation {
    #[error("Handle {0:?} is pending without an in-flight update")]
    PendingWithoutInFlight(HandleId),

    #[error("Derived view diverged from a fresh replay of the active updates")]
    StaleView,
}

/// Check the ledger shape, reporting the first violation
pub fn check_ledger<A, O>(ledger: &UpdateLedger<A, O>) -> Result<(), LedgerViolation> {
    match ledger.pending_handles().find(|h| !ledger.is_busy(*h)) {
        Some(h) => Err(LedgerViolation::PendingWithoutInFlight(h)),
        None => Ok(()),
    }
}

/// Check the ledger and that the view matches a full replay
pub fn check_store<S, A, O, F, E>(
    store: &ReconciliationStore<S, A, O, F, E>,
) -> Result<(), LedgerViolation>
where
    S: Clone + PartialEq,
    F: UpdateFn<S, A>,
    E: MutationExecutor<A, O>,
{
    check_ledger(store.ledger())?;

    match (store.authoritative(), store.view()) {
        (Some(_), Ok(view)) if store.replay().as_ref() == Some(view) => Ok(()),
        (None, Err(_)) => Ok(()),
        _ => Err(LedgerViolation::StaleView),
    }
}
