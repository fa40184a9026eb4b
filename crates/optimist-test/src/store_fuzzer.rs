//! Store Fuzzer - random submit/complete/snapshot sequences
//!
//! Every step is mirrored on a reference model that keeps the two maps as
//! plain vectors. After each step the fuzzer checks:
//! - Ledger invariants and view-is-a-fresh-replay
//! - View equals the model's replay (application order)
//! - Dispatch log equals the model's dispatch log
//! - Stale completions change nothing

use optimist_core::{HandleId, HandleMinter};
use optimist_state::{check_store, Completion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::{apply_record_action, record_store, RecordAction, RecordStore, Records, RequestTag};

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of handles
    pub handle_count: usize,
    /// Number of record keys actions touch
    pub key_count: u8,
    /// Number of operations to run
    pub op_count: usize,
    /// Relative weight of submissions
    pub submit_weight: u32,
    /// Relative weight of completions (including stale ones)
    pub complete_weight: u32,
    /// Relative weight of new snapshots
    pub snapshot_weight: u32,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            handle_count: 6,
            key_count: 4,
            op_count: 2000,
            submit_weight: 5,
            complete_weight: 4,
            snapshot_weight: 1,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            handle_count: 3,
            key_count: 2,
            op_count: 200,
            ..Default::default()
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            handle_count: 16,
            key_count: 8,
            op_count: 20000,
            ..Default::default()
        }
    }

    /// Mostly submissions: long coalescing chains
    pub fn bursty() -> Self {
        FuzzerConfig {
            submit_weight: 12,
            complete_weight: 2,
            snapshot_weight: 1,
            ..Default::default()
        }
    }
}

/// First property the store broke
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FuzzFailure {
    #[error("step {step}: invariant violated: {reason}")]
    Invariant { step: usize, reason: String },

    #[error("step {step}: view diverged from model")]
    ViewMismatch { step: usize },

    #[error("step {step}: dispatch log diverged from model")]
    DispatchMismatch { step: usize },

    #[error("step {step}: stale completion changed state")]
    StaleMutated { step: usize },
}

/// Summary of a clean run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuzzReport {
    pub steps: usize,
    pub submissions: u64,
    pub dispatches: u64,
    pub coalesced: u64,
    pub promotions: u64,
    pub stale_completions: u64,
    pub snapshots: u64,
}

#[derive(Clone, Copy, Debug)]
enum FuzzOp {
    Submit(usize, RecordAction),
    Complete(usize),
    Snapshot,
}

/// Reference model: insertion-ordered vectors of (handle index, action)
#[derive(Default)]
struct Model {
    snapshot: Records,
    in_flight: Vec<(usize, RecordAction, RequestTag)>,
    pending: Vec<(usize, RecordAction, RequestTag)>,
    dispatched: Vec<(usize, RecordAction, RequestTag)>,
}

impl Model {
    fn submit(&mut self, h: usize, action: RecordAction, tag: RequestTag) {
        if self.in_flight.iter().any(|e| e.0 == h) {
            self.pending.retain(|e| e.0 != h);
            self.pending.push((h, action, tag));
        } else {
            self.in_flight.push((h, action, tag));
            self.dispatched.push((h, action, tag));
        }
    }

    fn complete(&mut self, h: usize) -> bool {
        let before = self.in_flight.len();
        self.in_flight.retain(|e| e.0 != h);
        let settled = self.in_flight.len() != before;

        if let Some(pos) = self.pending.iter().position(|e| e.0 == h) {
            let next = self.pending.remove(pos);
            self.in_flight.push(next);
            self.dispatched.push(next);
        }
        settled
    }

    fn view(&self) -> Records {
        let mut view = self.snapshot.clone();
        for (_, action, _) in self.in_flight.iter().chain(self.pending.iter()) {
            apply_record_action(&mut view, action);
        }
        view
    }
}

/// Store fuzzer
pub struct StoreFuzzer {
    config: FuzzerConfig,
    store: RecordStore,
    model: Model,
    handles: Vec<HandleId>,
    rng: StdRng,
    next_tag: RequestTag,
}

impl StoreFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let minter = HandleMinter::new();
        let handles = (0..config.handle_count.max(1)).map(|_| minter.mint()).collect();

        StoreFuzzer {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            store: record_store(Records::new()),
            model: Model::default(),
            handles,
            next_tag: 0,
        }
    }

    /// Run the configured number of operations, stopping at the first failure
    pub fn run(&mut self) -> Result<FuzzReport, FuzzFailure> {
        for step in 0..self.config.op_count {
            let op = self.generate_op();
            self.step(step, op)?;
        }

        let stats = self.store.stats();
        Ok(FuzzReport {
            steps: self.config.op_count,
            submissions: stats.submissions,
            dispatches: stats.dispatches,
            coalesced: stats.coalesced,
            promotions: stats.promotions,
            stale_completions: stats.stale_completions,
            snapshots: stats.snapshots,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn generate_op(&mut self) -> FuzzOp {
        let c = &self.config;
        let total = c.submit_weight + c.complete_weight + c.snapshot_weight;
        let roll = self.rng.gen_range(0..total.max(1));
        let h = self.rng.gen_range(0..self.handles.len());

        if roll < c.submit_weight {
            let key = self.rng.gen_range(0..c.key_count.max(1));
            let action = if self.rng.gen_bool(0.5) {
                RecordAction::Set {
                    key,
                    value: self.rng.gen_range(0..1000),
                }
            } else {
                RecordAction::Bump { key }
            };
            FuzzOp::Submit(h, action)
        } else if roll < c.submit_weight + c.complete_weight {
            FuzzOp::Complete(h)
        } else {
            FuzzOp::Snapshot
        }
    }

    fn random_snapshot(&mut self) -> Records {
        let len = self.rng.gen_range(0..=self.config.key_count);
        (0..len).map(|k| (k, self.rng.gen_range(0..1000))).collect()
    }

    fn step(&mut self, step: usize, op: FuzzOp) -> Result<(), FuzzFailure> {
        match op {
            FuzzOp::Submit(h, action) => {
                let tag = self.next_tag;
                self.next_tag += 1;
                self.store.submit(self.handles[h], action, tag);
                self.model.submit(h, action, tag);
            }
            FuzzOp::Complete(h) => {
                let before_view = self.store.view().ok().cloned();
                let before_dispatches = self.store.executor().len();

                let completion = self.store.notify_complete(self.handles[h]);
                let settled = self.model.complete(h);

                if !settled {
                    let unchanged = completion == Completion::Stale
                        && self.store.view().ok() == before_view.as_ref()
                        && self.store.executor().len() == before_dispatches;
                    if !unchanged {
                        return Err(FuzzFailure::StaleMutated { step });
                    }
                }
            }
            FuzzOp::Snapshot => {
                let snapshot = self.random_snapshot();
                self.store.set_authoritative(snapshot.clone());
                self.model.snapshot = snapshot;
            }
        }

        self.verify(step)
    }

    fn verify(&self, step: usize) -> Result<(), FuzzFailure> {
        check_store(&self.store).map_err(|e| FuzzFailure::Invariant {
            step,
            reason: e.to_string(),
        })?;

        if self.store.view().ok() != Some(&self.model.view()) {
            return Err(FuzzFailure::ViewMismatch { step });
        }

        let log = self.store.executor().dispatched();
        let matches = log.len() == self.model.dispatched.len()
            && log
                .iter()
                .zip(&self.model.dispatched)
                .all(|((handle, update), (h, action, tag))| {
                    *handle == self.handles[*h] && update.action() == action && update.options() == tag
                });
        if !matches {
            return Err(FuzzFailure::DispatchMismatch { step });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzer_light() {
        let mut fuzzer = StoreFuzzer::new(FuzzerConfig::light());
        let report = fuzzer.run().unwrap();

        assert_eq!(report.steps, 200);
        assert!(report.submissions > 0);
        assert!(report.dispatches <= report.submissions);
    }

    #[test]
    fn test_fuzzer_default() {
        let mut fuzzer = StoreFuzzer::new(FuzzerConfig::default());
        let report = fuzzer.run().unwrap();

        assert!(report.promotions > 0);
        assert!(report.stale_completions > 0);
    }

    #[test]
    fn test_fuzzer_bursty_coalesces() {
        let mut fuzzer = StoreFuzzer::new(FuzzerConfig::bursty());
        let report = fuzzer.run().unwrap();

        assert!(report.coalesced > 0);
        // Every submission is dispatched, coalesced away, or still pending
        let pending = fuzzer.store().ledger().pending_len() as u64;
        assert_eq!(
            report.submissions,
            report.dispatches + report.coalesced + pending
        );
    }

    #[test]
    fn test_fuzzer_many_seeds() {
        for seed in 0..20 {
            let mut fuzzer = StoreFuzzer::new(FuzzerConfig {
                seed,
                ..FuzzerConfig::light()
            });
            if let Err(e) = fuzzer.run() {
                panic!("seed {seed}: {e}");
            }
        }
    }
}
