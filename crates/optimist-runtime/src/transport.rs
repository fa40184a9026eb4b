//! Transport and authoritative-source contracts, and the spawning executor

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use optimist_core::{HandleId, MutationExecutor, OptimistResult, Update};

/// Performs one mutation request against the source of truth
pub trait Transport<A, O> {
    fn perform(&self, action: A, options: O) -> impl Future<Output = OptimistResult<()>> + Send;
}

/// Supplies authoritative snapshots
pub trait AuthoritativeSource<S> {
    fn fetch(&self) -> impl Future<Output = OptimistResult<S>> + Send;
}

impl<A, O, T: Transport<A, O>> Transport<A, O> for Arc<T> {
    fn perform(&self, action: A, options: O) -> impl Future<Output = OptimistResult<()>> + Send {
        (**self).perform(action, options)
    }
}

impl<S, R: AuthoritativeSource<S>> AuthoritativeSource<S> for Arc<R> {
    fn fetch(&self) -> impl Future<Output = OptimistResult<S>> + Send {
        (**self).fetch()
    }
}

/// A dispatched request reached a final state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settled {
    pub handle: HandleId,
    pub outcome: OptimistResult<()>,
}

pub type SettlementSender = mpsc::Sender<Settled>;
pub type SettlementReceiver = mpsc::Receiver<Settled>;

/// Executor that runs each dispatch as a tokio task and reports the
/// settlement on a channel
pub struct SpawningExecutor<T> {
    transport: Arc<T>,
    settled_tx: SettlementSender,
    runtime: Handle,
}

impl<T> SpawningExecutor<T> {
    /// Create an executor bound to the current tokio runtime.
    ///
    /// Must be called from within a runtime context.
    pub fn new(transport: Arc<T>, buffer: usize) -> (Self, SettlementReceiver) {
        let (settled_tx, settled_rx) = mpsc::channel(buffer.max(1));
        let executor = SpawningExecutor {
            transport,
            settled_tx,
            runtime: Handle::current(),
        };
        (executor, settled_rx)
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

impl<A, O, T> MutationExecutor<A, O> for SpawningExecutor<T>
where
    A: Clone + Send + 'static,
    O: Clone + Send + 'static,
    T: Transport<A, O> + Send + Sync + 'static,
{
    fn dispatch(&mut self, handle: HandleId, update: &Update<A, O>) {
        let transport = Arc::clone(&self.transport);
        let tx = self.settled_tx.clone();
        let (action, options) = update.clone().into_parts();

        self.runtime.spawn(async move {
            let outcome = transport.perform(action, options).await;
            match &outcome {
                Ok(()) => debug!(handle = %handle, "request settled"),
                Err(e) => warn!(handle = %handle, error = %e, "request failed"),
            }
            if tx.send(Settled { handle, outcome }).await.is_err() {
                debug!(handle = %handle, "session gone, settlement dropped");
            }
        });
    }
}
