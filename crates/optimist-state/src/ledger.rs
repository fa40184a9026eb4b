//! Update ledger - in-flight and pending updates keyed by handle

use indexmap::IndexMap;
use optimist_core::{HandleId, Update};

/// Where a submission landed in the ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Handle was idle; update is now in flight and must be dispatched
    InFlight,
    /// Handle was busy; update is now pending
    Pending {
        /// A previous pending update was discarded
        replaced: bool,
    },
}

/// Result of settling a handle's in-flight update
#[derive(Clone, Debug, PartialEq)]
pub struct Settlement<'a, A, O> {
    /// An in-flight entry existed and was removed
    pub settled: bool,
    /// Pending update moved to in flight, to be dispatched
    pub promoted: Option<&'a Update<A, O>>,
}

/// The two active-update maps
///
/// Both maps keep insertion order. A handle appears at most once in each,
/// and a handle is only ever pending while it is also in flight.
#[derive(Clone, Debug)]
pub struct UpdateLedger<A, O> {
    in_flight: IndexMap<HandleId, Update<A, O>>,
    pending: IndexMap<HandleId, Update<A, O>>,
}

impl<A, O> UpdateLedger<A, O> {
    pub fn new() -> Self {
        UpdateLedger {
            in_flight: IndexMap::new(),
            pending: IndexMap::new(),
        }
    }

    /// Record a submission for `handle`
    pub fn place(&mut self, handle: HandleId, update: Update<A, O>) -> Placement {
        if !self.in_flight.contains_key(&handle) {
            self.in_flight.insert(handle, update);
            return Placement::InFlight;
        }

        // Latest wins; the replacement goes to the back of the order.
        let replaced = self.pending.shift_remove(&handle).is_some();
        self.pending.insert(handle, update);
        Placement::Pending { replaced }
    }

    /// Remove `handle`'s in-flight update and promote its pending one
    pub fn settle(&mut self, handle: HandleId) -> Settlement<'_, A, O> {
        let settled = self.in_flight.shift_remove(&handle).is_some();

        let Some(next) = self.pending.shift_remove(&handle) else {
            return Settlement {
                settled,
                promoted: None,
            };
        };

        self.in_flight.insert(handle, next);
        Settlement {
            settled,
            promoted: self.in_flight.get(&handle),
        }
    }

    /// Drop the handle's pending update, if any. The in-flight one stays
    /// until its settlement arrives.
    pub fn discard_pending(&mut self, handle: HandleId) -> bool {
        self.pending.shift_remove(&handle).is_some()
    }

    pub fn in_flight(&self, handle: HandleId) -> Option<&Update<A, O>> {
        self.in_flight.get(&handle)
    }

    pub fn pending(&self, handle: HandleId) -> Option<&Update<A, O>> {
        self.pending.get(&handle)
    }

    /// Handle has an update in flight
    pub fn is_busy(&self, handle: HandleId) -> bool {
        self.in_flight.contains_key(&handle)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.in_flight.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty() && self.pending.is_empty()
    }

    /// Handles with an in-flight update, in insertion order
    pub fn in_flight_handles(&self) -> impl Iterator<Item = HandleId> + '_ {
        self.in_flight.keys().copied()
    }

    /// Handles with a pending update, in insertion order
    pub fn pending_handles(&self) -> impl Iterator<Item = HandleId> + '_ {
        self.pending.keys().copied()
    }

    /// Every active update in application order: in-flight group first,
    /// then the pending group, each in insertion order.
    pub fn active_updates(&self) -> impl Iterator<Item = (HandleId, &Update<A, O>)> + '_ {
        self.in_flight
            .iter()
            .chain(self.pending.iter())
            .map(|(h, u)| (*h, u))
    }
}

impl<A, O> Default for UpdateLedger<A, O> {
    fn default() -> Self {
        Self::new()
    }
}
