//! optimist demo - a person and their favourite dogs
//!
//! - Route data and the in-memory registry that owns it
//! - The action schema that shapes raw form input
//! - Edit widgets that each own one handle

pub mod actions;
pub mod data;
pub mod forms;

pub use actions::*;
pub use data::*;
pub use forms::*;
