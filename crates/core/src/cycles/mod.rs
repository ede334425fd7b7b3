//! Cycle record domain models and statistics.

mod model;
mod stats;

pub use model::*;
pub use stats::*;
