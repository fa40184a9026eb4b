//! Mutation executor contract
//!
//! The store hands every dispatched update to an executor and forgets
//! about it. The executor performs the request however it likes and later
//! reports settlement for the handle through `notify_complete`, exactly
//! once per dispatch that actually ran.

use crate::{HandleId, Update};

/// Performs dispatched updates
pub trait MutationExecutor<A, O> {
    fn dispatch(&mut self, handle: HandleId, update: &Update<A, O>);
}

impl<A, O, F> MutationExecutor<A, O> for F
where
    F: FnMut(HandleId, &Update<A, O>),
{
    #[inline]
    fn dispatch(&mut self, handle: HandleId, update: &Update<A, O>) {
        self(handle, update)
    }
}

/// Executor that drops every dispatch
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopExecutor;

impl<A, O> MutationExecutor<A, O> for NoopExecutor {
    fn dispatch(&mut self, _handle: HandleId, _update: &Update<A, O>) {}
}

/// Executor that records every dispatch in order
#[derive(Clone, Debug)]
pub struct RecordingExecutor<A, O> {
    dispatched: Vec<(HandleId, Update<A, O>)>,
}

impl<A, O> RecordingExecutor<A, O> {
    pub fn new() -> Self {
        RecordingExecutor {
            dispatched: Vec::new(),
        }
    }

    /// All dispatches so far, oldest first
    pub fn dispatched(&self) -> &[(HandleId, Update<A, O>)] {
        &self.dispatched
    }

    /// Dispatches made for one handle, oldest first
    pub fn dispatched_for(&self, handle: HandleId) -> impl Iterator<Item = &Update<A, O>> {
        self.dispatched
            .iter()
            .filter(move |(h, _)| *h == handle)
            .map(|(_, u)| u)
    }

    pub fn last(&self) -> Option<&(HandleId, Update<A, O>)> {
        self.dispatched.last()
    }

    pub fn len(&self) -> usize {
        self.dispatched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty()
    }

    /// Take the recorded dispatches, leaving the log empty
    pub fn drain(&mut self) -> Vec<(HandleId, Update<A, O>)> {
        std::mem::take(&mut self.dispatched)
    }
}

impl<A, O> Default for RecordingExecutor<A, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone, O: Clone> MutationExecutor<A, O> for RecordingExecutor<A, O> {
    fn dispatch(&mut self, handle: HandleId, update: &Update<A, O>) {
        self.dispatched.push((handle, update.clone()));
    }
}
