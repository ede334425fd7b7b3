//! Persistence arbitration: coordinator, adapter contracts, connectivity.

mod coordinator;
mod monitor;

pub use coordinator::*;
pub use monitor::*;
