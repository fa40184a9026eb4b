//! Optimistic reconciliation store
//!
//! The store keeps the last authoritative snapshot and every update that is
//! still in flight or queued behind one. The derived view is never patched:
//! each state-affecting call clones the snapshot and replays all active
//! updates, in-flight group first, then pending, each in insertion order.
//!
//! Dispatch policy: a submission for an idle handle is dispatched to the
//! executor immediately. A submission for a busy handle waits as that
//! handle's single pending update and is dispatched only when the in-flight
//! one settles. A newer submission replaces an older pending one, which is
//! then never dispatched.

use tracing::{debug, trace, warn};

use optimist_core::{HandleId, MutationExecutor, OptimistError, OptimistResult, Update, UpdateFn};

use crate::{Placement, UpdateLedger};

/// What `submit` did with an update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Handle was idle; the update went straight to the executor
    Dispatched,
    /// Handle was busy; the update waits for the in-flight one to settle
    Queued { replaced: bool },
}

/// What `notify_complete` did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// No in-flight update for the handle; nothing changed
    Stale,
    /// In-flight update removed, nothing queued behind it
    Settled,
    /// In-flight update removed and the pending one dispatched in its place
    Promoted,
}

/// Store counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub submissions: u64,
    pub dispatches: u64,
    pub coalesced: u64,
    pub promotions: u64,
    pub settlements: u64,
    pub stale_completions: u64,
    pub snapshots: u64,
    pub recomputes: u64,
}

/// Optimistic update reconciliation store
pub struct ReconciliationStore<S, A, O, F, E> {
    /// Last snapshot from the source of truth
    authoritative: Option<S>,
    /// Snapshot plus active updates
    view: Option<S>,
    /// In-flight and pending updates
    ledger: UpdateLedger<A, O>,
    update_fn: F,
    executor: E,
    stats: StoreStats,
}

impl<S, A, O, F, E> ReconciliationStore<S, A, O, F, E>
where
    S: Clone,
    F: UpdateFn<S, A>,
    E: MutationExecutor<A, O>,
{
    /// Create an unseeded store. `view` fails until the first snapshot.
    pub fn new(update_fn: F, executor: E) -> Self {
        ReconciliationStore {
            authoritative: None,
            view: None,
            ledger: UpdateLedger::new(),
            update_fn,
            executor,
            stats: StoreStats::default(),
        }
    }

    /// Create a store seeded with its first snapshot
    pub fn with_snapshot(snapshot: S, update_fn: F, executor: E) -> Self {
        let mut store = Self::new(update_fn, executor);
        store.set_authoritative(snapshot);
        store
    }

    /// Replace the authoritative snapshot and rebuild the view
    pub fn set_authoritative(&mut self, snapshot: S) {
        self.authoritative = Some(snapshot);
        self.stats.snapshots += 1;
        self.recompute();
    }

    /// Record an update for `handle` and rebuild the view
    pub fn submit(&mut self, handle: HandleId, action: A, options: O) -> SubmitOutcome {
        self.stats.submissions += 1;

        let outcome = match self.ledger.place(handle, Update::new(action, options)) {
            Placement::InFlight => {
                if let Some(update) = self.ledger.in_flight(handle) {
                    debug!(handle = %handle, "dispatching update");
                    self.executor.dispatch(handle, update);
                    self.stats.dispatches += 1;
                }
                SubmitOutcome::Dispatched
            }
            Placement::Pending { replaced } => {
                if replaced {
                    debug!(handle = %handle, "pending update superseded");
                    self.stats.coalesced += 1;
                } else {
                    debug!(handle = %handle, "handle busy, update queued");
                }
                SubmitOutcome::Queued { replaced }
            }
        };

        self.recompute();
        outcome
    }

    /// Settle `handle`'s in-flight update, whatever the request's outcome.
    ///
    /// A queued update for the handle is promoted and dispatched. A call
    /// for a handle with nothing in flight is a no-op.
    pub fn notify_complete(&mut self, handle: HandleId) -> Completion {
        let settlement = self.ledger.settle(handle);
        let settled = settlement.settled;

        let completion = match settlement.promoted {
            Some(next) => {
                debug!(handle = %handle, "promoting pending update");
                self.executor.dispatch(handle, next);
                self.stats.dispatches += 1;
                self.stats.promotions += 1;
                Completion::Promoted
            }
            None if settled => Completion::Settled,
            None => {
                warn!(handle = %handle, "completion for handle with nothing in flight");
                self.stats.stale_completions += 1;
                return Completion::Stale;
            }
        };

        if settled {
            self.stats.settlements += 1;
        }
        self.recompute();
        completion
    }

    /// Retire a handle whose origin is going away.
    ///
    /// Only the queued update is dropped, so nothing is dispatched after the
    /// request already running. That request stays in flight and settles
    /// through `notify_complete` as usual. Returns whether anything was
    /// dropped.
    pub fn retire(&mut self, handle: HandleId) -> bool {
        let dropped = self.ledger.discard_pending(handle);
        if dropped {
            debug!(handle = %handle, "handle retired, pending update dropped");
            self.stats.coalesced += 1;
            self.recompute();
        }
        dropped
    }

    /// Current derived view
    pub fn view(&self) -> OptimistResult<&S> {
        self.view.as_ref().ok_or(OptimistError::Uninitialized)
    }

    /// Last authoritative snapshot, if any
    pub fn authoritative(&self) -> Option<&S> {
        self.authoritative.as_ref()
    }

    /// Fresh replay of the active updates over the snapshot
    pub fn replay(&self) -> Option<S> {
        let mut draft = self.authoritative.as_ref()?.clone();
        for (_, update) in self.ledger.active_updates() {
            self.update_fn.apply(&mut draft, update.action());
        }
        Some(draft)
    }

    pub fn ledger(&self) -> &UpdateLedger<A, O> {
        &self.ledger
    }

    /// Any update currently in flight
    pub fn is_saving(&self) -> bool {
        self.ledger.in_flight_len() > 0
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Tear the store down into its snapshot, pending work and executor
    pub fn into_parts(self) -> (Option<S>, UpdateLedger<A, O>, E) {
        (self.authoritative, self.ledger, self.executor)
    }

    fn recompute(&mut self) {
        if self.authoritative.is_none() {
            return;
        }
        self.view = self.replay();
        self.stats.recomputes += 1;
        trace!(active = self.ledger.active_len(), "view recomputed");
    }
}
