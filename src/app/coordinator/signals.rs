//! Signal handling for graceful shutdown
//!
//! Ctrl-C and SIGTERM set the shared [`CancellationFlag`]. A running sync
//! notices it at the next chunk or member boundary, removes any partial
//! output and stops; entries already committed stay committed.

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::cancel::CancellationFlag;

/// Signal handler for graceful shutdown coordination
pub struct SignalHandler {
    cancel: CancellationFlag,
}

impl SignalHandler {
    /// Create a new signal handler that sets `cancel`
    pub fn new(cancel: CancellationFlag) -> Self {
        Self { cancel }
    }

    /// Setup signal handling for graceful shutdown (CTRL-C, SIGTERM)
    ///
    /// Returns a handle to the background task that monitors for signals.
    pub fn setup(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling sync");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling sync");
                },
            }

            cancel.cancel();
        })
    }
}
