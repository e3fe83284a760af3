//! Connectivity feed for host platforms
//!
//! The library has no portable way to sense the link itself; hosts own a
//! [`ConnectivityMonitor`] and push status changes into it. Everything
//! downstream (the offline store's watcher, the service's offline check)
//! observes it through the [`Connectivity`] port.

use courier_core::Connectivity;
use courier_domain::{ConnectionType, NetworkStatus};
use tokio::sync::watch;
use tracing::debug;

/// Watch-channel backed [`Connectivity`] implementation fed by the host.
pub struct ConnectivityMonitor {
    tx: watch::Sender<NetworkStatus>,
}

impl ConnectivityMonitor {
    /// Create a monitor reporting the given initial status.
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Monitor that starts online over the given link.
    pub fn online(connection: ConnectionType) -> Self {
        Self::new(NetworkStatus::online(connection))
    }

    /// Monitor that starts offline.
    pub fn offline() -> Self {
        Self::new(NetworkStatus::offline())
    }

    /// Publish a full status snapshot.
    pub fn set_status(&self, status: NetworkStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            debug!(
                online = status.is_online,
                connection = ?status.connection,
                "connectivity changed"
            );
        }
    }

    /// Publish an online/offline flip without link details.
    pub fn set_online(&self, online: bool) {
        let status = if online {
            NetworkStatus::online(ConnectionType::Unknown)
        } else {
            NetworkStatus::offline()
        };
        self.set_status(status);
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::offline()
    }
}

impl Connectivity for ConnectivityMonitor {
    fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }
}
