//! optimist test harness - store fuzzing and settlement simulation
//!
//! This crate provides:
//! - A keyed-record domain shared by the harnesses
//! - Store fuzzing against an independent reference model
//! - Settlement simulation with per-request latency and revalidation

pub mod domain;
pub mod store_fuzzer;
pub mod simulator;

pub use domain::*;
pub use store_fuzzer::*;
pub use simulator::*;
