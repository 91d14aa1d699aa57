//! Shutdown coordination.
//!
//! A [`ShutdownHandle`] is a clonable one-shot broadcast: any holder may
//! trigger it, every waiter observes it. The consumer group's coordinator
//! and the HTTP server share one handle so a single signal stops both.

use tokio::sync::watch;

/// What triggered the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Received SIGINT (Ctrl+C).
    SigInt,
    /// Received SIGTERM.
    SigTerm,
    /// Shutdown requested in-process.
    Manual,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SigInt => write!(f, "SIGINT (Ctrl+C)"),
            Self::SigTerm => write!(f, "SIGTERM"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Handle for triggering and observing shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<Option<ShutdownSignal>>,
    receiver: watch::Receiver<Option<ShutdownSignal>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self { sender, receiver }
    }

    /// Broadcast a shutdown signal. Later signals do not overwrite the first
    /// observed one for waiters that already returned.
    pub fn signal(&self, signal: ShutdownSignal) {
        let _ = self.sender.send(Some(signal));
    }

    /// Trigger an in-process shutdown.
    pub fn shutdown(&self) {
        self.signal(ShutdownSignal::Manual);
    }

    /// Wait until shutdown is signaled.
    pub async fn wait(&mut self) -> ShutdownSignal {
        loop {
            if let Some(signal) = *self.receiver.borrow() {
                return signal;
            }
            if self.receiver.changed().await.is_err() {
                return ShutdownSignal::Manual;
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.receiver.borrow().is_some()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve when the process receives SIGINT or SIGTERM.
pub async fn os_signal() -> ShutdownSignal {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        ShutdownSignal::SigInt
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
        ShutdownSignal::SigTerm
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<ShutdownSignal>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}
