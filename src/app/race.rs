//! Race an operation against a fixed timer
//!
//! The operation runs as its own task. If the timer wins, the task is
//! abandoned rather than aborted: it keeps running in the background and
//! its result is dropped.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Outcome of [`race_against_timer`]
#[derive(Debug, PartialEq, Eq)]
pub enum Raced<T> {
    /// The operation finished first
    Completed(T),
    /// The timer fired first
    TimedOut,
}

/// Whichever of `operation` and `limit` finishes first decides the outcome
///
/// A panicking operation is reported as timed out.
pub async fn race_against_timer<F, T>(label: &str, limit: Duration, operation: F) -> Raced<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(operation);

    tokio::select! {
        joined = &mut handle => match joined {
            Ok(value) => Raced::Completed(value),
            Err(e) => {
                warn!("{} task failed: {}", label, e);
                Raced::TimedOut
            }
        },
        _ = tokio::time::sleep(limit) => {
            debug!("{} abandoned after {:?}", label, limit);
            Raced::TimedOut
        }
    }
}
