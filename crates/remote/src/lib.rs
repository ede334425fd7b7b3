//! Remote store adapter for the cycle tracking core.
//!
//! Talks to a PostgREST-style `cycles` endpoint and translates between the
//! canonical record shape and the remote schema's snake_case field names.
//! Surfaces exactly two failure shapes (transport, shape); never retries.

mod client;
mod types;

pub use client::RemoteCycleClient;
pub use types::CycleRow;

use std::env;

/// Environment variable holding the remote endpoint base URL.
pub const REMOTE_URL_ENV: &str = "CYCLETRACK_REMOTE_URL";

/// Environment variable holding the remote API key.
pub const REMOTE_KEY_ENV: &str = "CYCLETRACK_REMOTE_KEY";

/// Remote endpoint configuration. Its presence at startup is what makes the
/// process "remote configured"; it never changes afterwards.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Read the configuration from the environment. `None` when either
    /// variable is unset or empty, meaning the engine runs local-only.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var(REMOTE_URL_ENV).ok().filter(|v| !v.is_empty())?;
        let api_key = env::var(REMOTE_KEY_ENV).ok().filter(|v| !v.is_empty())?;
        Some(Self::new(base_url, api_key))
    }
}
