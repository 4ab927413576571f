//! Server liveness monitoring.
//!
//! The editor shows whether saves will reach the server or fall back to a
//! download. [`StatusMonitor`] probes the server on a fixed interval and
//! publishes the result through a watch channel; only transitions are logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tracing::{info, warn};

use crate::client::SaveTransport;

/// Last known server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    /// No probe has completed yet.
    #[default]
    Unknown,
    /// The liveness probe succeeded.
    Online,
    /// The liveness probe failed.
    Offline,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

impl ServerStatus {
    /// From a probe result.
    #[must_use]
    pub fn from_probe(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    /// Status banner text.
    ///
    /// `file_mode` is true when the editor has no server origin at all.
    #[must_use]
    pub fn describe(&self, file_mode: bool, admin_url: &str) -> String {
        match self {
            Self::Unknown => "Checking server...".to_string(),
            Self::Online => "Server available - saves go straight to the data file".to_string(),
            Self::Offline if file_mode => {
                format!("Start the server, then open {admin_url}")
            }
            Self::Offline => {
                "Server unavailable - saving will download a JSON file instead".to_string()
            }
        }
    }
}

/// A cloneable handle used to stop a running monitor.
#[derive(Debug, Clone, Default)]
pub struct MonitorHandle {
    stop_signal: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl MonitorHandle {
    /// Create a new monitor handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the monitor to stop; a sleeping monitor wakes immediately.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

/// Polls a transport's liveness probe.
#[derive(Debug)]
pub struct StatusMonitor<T> {
    transport: Arc<T>,
    interval: Duration,
    handle: MonitorHandle,
    tx: watch::Sender<ServerStatus>,
}

impl<T: SaveTransport> StatusMonitor<T> {
    /// Create a monitor and the receiver its updates go to.
    #[must_use]
    pub fn new(transport: Arc<T>, interval: Duration) -> (Self, watch::Receiver<ServerStatus>) {
        let (tx, rx) = watch::channel(ServerStatus::Unknown);
        let monitor = Self {
            transport,
            interval,
            handle: MonitorHandle::new(),
            tx,
        };
        (monitor, rx)
    }

    /// A handle that stops this monitor.
    #[must_use]
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Probe once and publish the result.
    ///
    /// Receivers are only woken when the status changes.
    pub async fn check(&self) -> ServerStatus {
        let status = ServerStatus::from_probe(self.transport.probe().await);
        let changed = self
            .tx
            .send_if_modified(|current| std::mem::replace(current, status) != status);
        if changed {
            match status {
                ServerStatus::Online => info!("Server is {}", status),
                _ => warn!("Server is {}", status),
            }
        }
        status
    }

    /// Probe every interval until stopped.
    pub async fn run(self) {
        while !self.handle.should_stop() {
            self.check().await;
            // Register interest before re-checking the flag so a stop between
            // the check and the sleep is not missed.
            let woken = self.handle.wake.notified();
            if self.handle.should_stop() {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = woken => {}
            }
        }
    }
}
