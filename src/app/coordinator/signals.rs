//! Signal handling for cancelling in-flight uploads
//!
//! Ctrl-C (and SIGTERM on unix) cancels a `CancellationToken`; the poll loop
//! observes it at the next tick boundary and the flow unwinds normally,
//! dismissing the progress surface on the way out.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Signal handler that cancels a token
pub struct SignalHandler {
    token: CancellationToken,
}

impl SignalHandler {
    /// Create a handler cancelling the given token
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Spawn the background task that waits for a signal
    ///
    /// The task ends on the first signal or when the token is cancelled
    /// by someone else.
    pub fn setup(&self) -> JoinHandle<()> {
        let token = self.token.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
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
                    info!("Received Ctrl+C, cancelling");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling");
                },
                _ = token.cancelled() => return,
            }

            token.cancel();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_task_exits_when_token_cancelled() {
        let token = CancellationToken::new();
        let handle = SignalHandler::new(token.clone()).setup();

        token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("handler task should finish")
            .unwrap();
    }
}
