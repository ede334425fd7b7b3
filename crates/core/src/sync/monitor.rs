//! Connectivity and configuration state.

use std::sync::Arc;

use log::debug;
use tokio::sync::watch;

/// Tracks whether a remote store is configured and whether the device is
/// online. Reports state only; synchronization is always command-triggered
/// by the coordinator, which re-checks usability lazily per operation.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    remote_configured: bool,
    online: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// `remote_configured` is fixed for the process lifetime (presence of a
    /// remote endpoint and credential at startup).
    pub fn new(remote_configured: bool, initially_online: bool) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self {
            remote_configured,
            online: Arc::new(online),
        }
    }

    pub fn remote_configured(&self) -> bool {
        self.remote_configured
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Publish a connectivity change from the host environment.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.send_replace(online);
        if previous != online {
            debug!("connectivity changed: online={}", online);
        }
    }

    /// Subscribe to connectivity transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// A remote write/read is worth attempting.
    pub fn remote_usable(&self) -> bool {
        self.remote_configured && self.is_online()
    }
}
