//! optimist state engine - optimistic update reconciliation
//!
//! This crate implements the reconciliation store:
//! - Per-handle ledger of in-flight and pending updates
//! - Latest-wins coalescing of queued updates
//! - Promotion and dispatch on completion
//! - Full recomputation of the derived view
//! - Invariant checks for harnesses

pub mod ledger;
pub mod reconcile;
pub mod invariants;

#[cfg(test)]
mod proptests;

pub use ledger::*;
pub use reconcile::*;
pub use invariants::*;
