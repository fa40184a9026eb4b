//! Optimistic session - a reconciliation store driven by async I/O
//!
//! The session owns the completion channel and the authoritative source.
//! Submissions may come from anywhere holding a [`Submitter`]; settlements
//! are processed by whoever drives [`Session::next_settlement`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

use optimist_core::{HandleId, OptimistError, OptimistResult, UpdateFn};
use optimist_state::{Completion, ReconciliationStore, StoreStats, SubmitOutcome};

use crate::observability::settlement_span;
use crate::{AuthoritativeSource, RuntimeConfig, SettlementReceiver, SpawningExecutor, Transport};

type SessionStore<S, A, O, F, T> = ReconciliationStore<S, A, O, F, SpawningExecutor<T>>;

/// Store and view channel shared between the session and its submitters
struct Shared<S, A, O, F, T> {
    store: Mutex<SessionStore<S, A, O, F, T>>,
    view_tx: watch::Sender<Option<S>>,
}

impl<S, A, O, F, T> Shared<S, A, O, F, T>
where
    S: Clone,
    F: UpdateFn<S, A>,
    SpawningExecutor<T>: optimist_core::MutationExecutor<A, O>,
{
    /// Run `f` against the store and publish the view if it was rebuilt
    fn with_store<R>(&self, f: impl FnOnce(&mut SessionStore<S, A, O, F, T>) -> R) -> R {
        let mut store = self.store.lock();
        let recomputes = store.stats().recomputes;
        let result = f(&mut store);

        if store.stats().recomputes != recomputes {
            let view = store.view().ok().cloned();
            self.view_tx.send_if_modified(|slot| {
                *slot = view;
                true
            });
        }
        result
    }
}

/// Cloneable entry point for submitting updates from other tasks
pub struct Submitter<S, A, O, F, T> {
    shared: Arc<Shared<S, A, O, F, T>>,
}

impl<S, A, O, F, T> Clone for Submitter<S, A, O, F, T> {
    fn clone(&self) -> Self {
        Submitter {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, A, O, F, T> Submitter<S, A, O, F, T>
where
    S: Clone,
    F: UpdateFn<S, A>,
    SpawningExecutor<T>: optimist_core::MutationExecutor<A, O>,
{
    pub fn submit(&self, handle: HandleId, action: A, options: O) -> SubmitOutcome {
        self.shared
            .with_store(|store| store.submit(handle, action, options))
    }

    /// Drop the queued update of a handle whose origin is going away
    pub fn retire(&self, handle: HandleId) -> bool {
        self.shared.with_store(|store| store.retire(handle))
    }

    /// Copy of the current derived view
    pub fn view(&self) -> OptimistResult<S> {
        self.shared.store.lock().view().cloned()
    }

    pub fn is_saving(&self) -> bool {
        self.shared.store.lock().is_saving()
    }

    pub fn is_busy(&self, handle: HandleId) -> bool {
        self.shared.store.lock().ledger().is_busy(handle)
    }

    /// Receiver that observes every recomputed view
    pub fn subscribe(&self) -> watch::Receiver<Option<S>> {
        self.shared.view_tx.subscribe()
    }
}

/// Outcome of processing one settlement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementReport {
    pub handle: HandleId,
    /// Whether the request itself succeeded
    pub outcome: OptimistResult<()>,
    /// What the store did with the handle's queue
    pub completion: Completion,
    /// A fresh snapshot was installed before the queue advanced
    pub revalidated: bool,
}

/// Optimistic session over a transport and an authoritative source
pub struct Session<S, A, O, F, T, R> {
    submitter: Submitter<S, A, O, F, T>,
    settled_rx: SettlementReceiver,
    source: R,
    config: RuntimeConfig,
}

impl<S, A, O, F, T, R> Session<S, A, O, F, T, R>
where
    S: Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    O: Clone + Send + 'static,
    F: UpdateFn<S, A>,
    T: Transport<A, O> + Send + Sync + 'static,
    R: AuthoritativeSource<S>,
{
    /// Fetch the first snapshot and open a session.
    ///
    /// Must be called within a tokio runtime; dispatched requests are
    /// spawned onto it.
    pub async fn start(
        config: RuntimeConfig,
        update_fn: F,
        transport: T,
        source: R,
    ) -> OptimistResult<Self> {
        let snapshot = source.fetch().await?;
        let (executor, settled_rx) =
            SpawningExecutor::new(Arc::new(transport), config.completion_buffer);
        let store = ReconciliationStore::with_snapshot(snapshot, update_fn, executor);
        let (view_tx, _) = watch::channel(store.view().ok().cloned());

        info!(
            buffer = config.completion_buffer,
            revalidate = config.revalidate_on_settle,
            "optimistic session started"
        );

        Ok(Session {
            submitter: Submitter {
                shared: Arc::new(Shared {
                    store: Mutex::new(store),
                    view_tx,
                }),
            },
            settled_rx,
            source,
            config,
        })
    }

    pub fn submitter(&self) -> Submitter<S, A, O, F, T> {
        self.submitter.clone()
    }

    pub fn submit(&self, handle: HandleId, action: A, options: O) -> SubmitOutcome {
        self.submitter.submit(handle, action, options)
    }

    pub fn view(&self) -> OptimistResult<S> {
        self.submitter.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<S>> {
        self.submitter.subscribe()
    }

    pub fn is_saving(&self) -> bool {
        self.submitter.is_saving()
    }

    pub fn stats(&self) -> StoreStats {
        self.submitter.shared.store.lock().stats().clone()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Fetch a fresh snapshot and install it
    pub async fn refresh(&self) -> OptimistResult<()> {
        let snapshot = self.source.fetch().await?;
        self.submitter
            .shared
            .with_store(|store| store.set_authoritative(snapshot));
        Ok(())
    }

    /// Wait for the next settled request and advance its handle.
    ///
    /// With revalidation on, the fresh snapshot is installed before the
    /// in-flight update is dropped, so the view never falls back to a
    /// snapshot that predates the request. A failed fetch is logged and the
    /// handle advances anyway.
    pub async fn next_settlement(&mut self) -> OptimistResult<SettlementReport> {
        let settled = self
            .settled_rx
            .recv()
            .await
            .ok_or(OptimistError::SessionClosed)?;
        let handle = settled.handle;

        async {
            let snapshot = if self.config.revalidate_on_settle {
                match self.source.fetch().await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        warn!(error = %e, "revalidation failed, keeping previous snapshot");
                        None
                    }
                }
            } else {
                None
            };
            let revalidated = snapshot.is_some();

            let completion = self.submitter.shared.with_store(|store| {
                if let Some(snapshot) = snapshot {
                    store.set_authoritative(snapshot);
                }
                store.notify_complete(handle)
            });
            debug!(?completion, revalidated, "settlement processed");

            Ok(SettlementReport {
                handle,
                outcome: settled.outcome,
                completion,
                revalidated,
            })
        }
        .instrument(settlement_span(handle))
        .await
    }

    /// Process settlements until nothing is in flight
    pub async fn run_until_idle(&mut self) -> OptimistResult<Vec<SettlementReport>> {
        let mut reports = Vec::new();
        while self.is_saving() {
            reports.push(self.next_settlement().await?);
        }
        Ok(reports)
    }
}
