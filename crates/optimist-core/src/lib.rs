//! optimist core - fundamental types and contracts
//!
//! This crate defines the types shared by the reconciliation engine and
//! its collaborators:
//! - Handle identities (HandleId, HandleMinter)
//! - The Update record (action + transport options)
//! - The UpdateFn and MutationExecutor contracts
//! - Error types

pub mod id;
pub mod update;
pub mod executor;
pub mod error;

pub use id::*;
pub use update::*;
pub use executor::*;
pub use error::*;
