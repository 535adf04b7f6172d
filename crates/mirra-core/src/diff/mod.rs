//! Structural diff engine
//!
//! Computes the minimal operation sequence that transforms one addon
//! collection into another, safe under sequential application.

pub mod display;
pub mod plan;
pub mod types;

pub use plan::diff;
pub use types::{ExclusionSet, Operation};
