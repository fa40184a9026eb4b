//! Settlement Simulator - virtual-time harness for request latency
//!
//! Simulates:
//! - Handles submitting at random ticks
//! - Per-request latency, so settlements arrive out of submission order
//! - A server applying requests in settlement order
//! - Optional revalidation after each settlement
//!
//! At the end every handle's last intent must have been sent, and once the
//! final snapshot lands the view must equal the server state.

use std::collections::HashMap;

use optimist_core::{HandleId, HandleMinter};
use optimist_state::check_store;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::{apply_record_action, record_store, RecordAction, RecordStore, Records};

/// Simulation configuration
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    pub handle_count: usize,
    pub key_count: u8,
    /// Total submissions to make before draining
    pub submissions: usize,
    /// Probability of a submission on each tick
    pub submit_prob: f64,
    /// Request latency range in ticks
    pub min_latency: u64,
    pub max_latency: u64,
    /// Probability of refetching the snapshot after a settlement
    pub revalidate_prob: f64,
    /// Upper bound on ticks, guards against a stuck drain
    pub max_ticks: u64,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            handle_count: 4,
            key_count: 3,
            submissions: 500,
            submit_prob: 0.6,
            min_latency: 1,
            max_latency: 20,
            revalidate_prob: 1.0,
            max_ticks: 100_000,
            seed: 7,
        }
    }
}

impl SimulatorConfig {
    /// Slow network: long, widely spread latencies
    pub fn slow_network() -> Self {
        SimulatorConfig {
            min_latency: 10,
            max_latency: 200,
            ..Default::default()
        }
    }

    /// Snapshots only rarely refetched
    pub fn lazy_revalidation() -> Self {
        SimulatorConfig {
            revalidate_prob: 0.1,
            ..Default::default()
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationFailure {
    #[error("tick {tick}: {reason}")]
    Invariant { tick: u64, reason: String },

    #[error("drain did not finish within {0} ticks")]
    Stuck(u64),

    #[error("handle {0:?}: last submitted intent was never sent")]
    LostIntent(HandleId),

    #[error("view did not converge to server state")]
    Diverged,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub ticks: u64,
    pub submissions: u64,
    pub dispatches: u64,
    pub coalesced: u64,
    pub revalidations: u64,
    pub max_in_flight: usize,
    /// Settlements that overtook a request dispatched earlier
    pub reordered: u64,
}

/// A request in transit
#[derive(Clone, Debug)]
struct Transit {
    due: u64,
    seq: u64,
    handle: HandleId,
    action: RecordAction,
}

pub struct SettlementSimulator {
    config: SimulatorConfig,
    store: RecordStore,
    server: Records,
    handles: Vec<HandleId>,
    transit: Vec<Transit>,
    last_intent: HashMap<HandleId, RecordAction>,
    last_sent: HashMap<HandleId, RecordAction>,
    rng: StdRng,
    clock: u64,
    dispatch_seq: u64,
    settled_seq: u64,
    report: SimulationReport,
}

impl SettlementSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let minter = HandleMinter::new();
        let handles = (0..config.handle_count.max(1)).map(|_| minter.mint()).collect();

        SettlementSimulator {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            store: record_store(Records::new()),
            server: Records::new(),
            handles,
            transit: Vec::new(),
            last_intent: HashMap::new(),
            last_sent: HashMap::new(),
            clock: 0,
            dispatch_seq: 0,
            settled_seq: 0,
            report: SimulationReport::default(),
        }
    }

    pub fn run(&mut self) -> Result<SimulationReport, SimulationFailure> {
        let mut remaining = self.config.submissions;

        while remaining > 0 || !self.transit.is_empty() {
            if self.clock >= self.config.max_ticks {
                return Err(SimulationFailure::Stuck(self.clock));
            }

            if remaining > 0 && self.rng.gen_bool(self.config.submit_prob) {
                self.submit_random();
                remaining -= 1;
            }
            self.deliver_due();

            check_store(&self.store).map_err(|e| SimulationFailure::Invariant {
                tick: self.clock,
                reason: e.to_string(),
            })?;
            self.report.max_in_flight = self
                .report
                .max_in_flight
                .max(self.store.ledger().in_flight_len());
            self.clock += 1;
        }

        self.finish()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn server(&self) -> &Records {
        &self.server
    }

    fn submit_random(&mut self) {
        let handle = self.handles[self.rng.gen_range(0..self.handles.len())];
        let key = self.rng.gen_range(0..self.config.key_count.max(1));
        let action = if self.rng.gen_bool(0.7) {
            RecordAction::Set {
                key,
                value: self.rng.gen_range(0..10_000),
            }
        } else {
            RecordAction::Bump { key }
        };

        self.store.submit(handle, action, self.clock);
        self.last_intent.insert(handle, action);
        self.schedule_dispatches();
    }

    /// Move freshly dispatched updates into transit
    fn schedule_dispatches(&mut self) {
        for (handle, update) in self.store.executor_mut().drain() {
            let latency = self
                .rng
                .gen_range(self.config.min_latency..=self.config.max_latency.max(self.config.min_latency));
            self.dispatch_seq += 1;
            self.last_sent.insert(handle, *update.action());
            self.transit.push(Transit {
                due: self.clock + latency,
                seq: self.dispatch_seq,
                handle,
                action: *update.action(),
            });
        }
    }

    fn deliver_due(&mut self) {
        let clock = self.clock;
        let (mut due, waiting): (Vec<Transit>, Vec<Transit>) =
            self.transit.drain(..).partition(|t| t.due <= clock);
        self.transit = waiting;
        due.sort_by_key(|t| (t.due, t.seq));

        for t in due {
            if t.seq < self.settled_seq {
                self.report.reordered += 1;
            }
            self.settled_seq = self.settled_seq.max(t.seq);

            apply_record_action(&mut self.server, &t.action);
            if self.rng.gen_bool(self.config.revalidate_prob) {
                self.store.set_authoritative(self.server.clone());
                self.report.revalidations += 1;
            }
            self.store.notify_complete(t.handle);
            self.schedule_dispatches();
        }
    }

    fn finish(&mut self) -> Result<SimulationReport, SimulationFailure> {
        for handle in &self.handles {
            if let Some(intent) = self.last_intent.get(handle) {
                if self.last_sent.get(handle) != Some(intent) {
                    return Err(SimulationFailure::LostIntent(*handle));
                }
            }
        }

        self.store.set_authoritative(self.server.clone());
        if !self.store.ledger().is_empty() || self.store.view().ok() != Some(&self.server) {
            return Err(SimulationFailure::Diverged);
        }

        let stats = self.store.stats();
        self.report.ticks = self.clock;
        self.report.submissions = stats.submissions;
        self.report.dispatches = stats.dispatches;
        self.report.coalesced = stats.coalesced;
        Ok(self.report.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_default() {
        let mut sim = SettlementSimulator::new(SimulatorConfig::default());
        let report = sim.run().unwrap();

        assert_eq!(report.submissions, 500);
        assert!(report.max_in_flight <= 4);
        assert!(report.reordered > 0);
        assert_eq!(sim.store().view().unwrap(), sim.server());
    }

    #[test]
    fn test_simulation_slow_network_coalesces() {
        let mut sim = SettlementSimulator::new(SimulatorConfig::slow_network());
        let report = sim.run().unwrap();

        assert!(report.coalesced > 0);
        assert!(report.dispatches < report.submissions);
    }

    #[test]
    fn test_simulation_lazy_revalidation_converges() {
        let mut sim = SettlementSimulator::new(SimulatorConfig::lazy_revalidation());
        let report = sim.run().unwrap();

        assert!(report.revalidations < report.dispatches);
    }

    #[test]
    fn test_simulation_single_handle_is_serial() {
        let mut sim = SettlementSimulator::new(SimulatorConfig {
            handle_count: 1,
            submissions: 100,
            ..Default::default()
        });
        let report = sim.run().unwrap();

        assert_eq!(report.max_in_flight, 1);
        assert_eq!(report.reordered, 0);
    }
}
