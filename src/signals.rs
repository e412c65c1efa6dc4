use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Shutdown signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Operator quit from the interactive prompt
    Quit,
    /// Device stream ended
    SourceClosed,
    /// SIGINT / SIGTERM
    Interrupted,
}

/// Cooperative process-wide shutdown flag
///
/// Cheap to clone. The first trigger wins; later triggers are ignored.
#[derive(Debug, Clone)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    sender: broadcast::Sender<ShutdownSignal>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Set the flag and wake every waiter
    pub fn trigger(&self, reason: ShutdownSignal) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down: {:?}", reason);
        let _ = self.sender.send(reason);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.sender.subscribe()
    }

    /// Resolve once shutdown was triggered
    pub async fn wait(&self) {
        let mut receiver = self.subscribe();
        if self.is_triggered() {
            return;
        }
        // Lagged or closed receivers also mean the flag is set or unreachable
        let _ = receiver.recv().await;
    }
}

/// Trigger `shutdown` on SIGINT / SIGTERM
#[cfg(unix)]
pub fn setup_signal_handlers(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to setup signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating shutdown");
                shutdown.trigger(ShutdownSignal::Interrupted);
            }
            _ = sigint.recv() => {
                info!("SIGINT received, initiating shutdown");
                shutdown.trigger(ShutdownSignal::Interrupted);
            }
            _ = shutdown.wait() => {}
        }
    })
}

/// Windows placeholder - only Ctrl+C is supported
#[cfg(not(unix))]
pub fn setup_signal_handlers(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Ctrl+C received, initiating shutdown");
                    shutdown.trigger(ShutdownSignal::Interrupted);
                }
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            },
            _ = shutdown.wait() => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_waiters() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        tokio::task::yield_now().await;
        shutdown.trigger(ShutdownSignal::Quit);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_first_trigger_wins() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        shutdown.trigger(ShutdownSignal::SourceClosed);
        shutdown.trigger(ShutdownSignal::Quit);

        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::SourceClosed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wait_after_trigger_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownSignal::Interrupted);
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_signal_handler_exits_on_shutdown() {
        let shutdown = Shutdown::new();
        let handle = setup_signal_handlers(shutdown.clone());
        shutdown.trigger(ShutdownSignal::Quit);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
