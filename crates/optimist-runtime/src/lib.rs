//! optimist runtime - async session orchestration
//!
//! This crate drives a reconciliation store from async code:
//! 1. Submit updates from any task through a shared session handle
//! 2. Spawn each dispatched update as a transport request
//! 3. Collect settlements on a completion channel
//! 4. Revalidate the authoritative snapshot after each settlement
//! 5. Advance the handle's queue and publish the new view

pub mod config;
pub mod observability;
pub mod transport;
pub mod session;

pub use config::*;
pub use transport::*;
pub use session::*;
