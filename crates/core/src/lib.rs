//! Offline-first cycle tracking core.
//!
//! Owns the canonical cycle record collection, arbitrates between a remote
//! store and a local cache snapshot, and derives trend statistics. All UI
//! concerns live in collaborators that call into this crate with plain data.

pub mod cycles;
pub mod errors;
pub mod sync;

pub use errors::{Error, RemoteStoreError, Result};
