//! Upload flow state machine states and transition tracking

use std::fmt;

use tokio::sync::{broadcast, watch};

/// How a finished flow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Success,
    Failure,
}

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Uploading,
    Polling,
    Downloading,
    Done(FlowOutcome),
}

impl FlowState {
    /// Whether an attempt is in flight
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            FlowState::Uploading | FlowState::Polling | FlowState::Downloading
        )
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => write!(f, "idle"),
            FlowState::Uploading => write!(f, "uploading"),
            FlowState::Polling => write!(f, "polling"),
            FlowState::Downloading => write!(f, "downloading"),
            FlowState::Done(FlowOutcome::Success) => write!(f, "done (success)"),
            FlowState::Done(FlowOutcome::Failure) => write!(f, "done (failure)"),
        }
    }
}

const TRANSITION_BUFFER: usize = 32;

/// Current state plus a stream of every transition
#[derive(Debug)]
pub struct FlowStateTracker {
    current: watch::Sender<FlowState>,
    transitions: broadcast::Sender<FlowState>,
}

impl Default for FlowStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowStateTracker {
    /// Tracker starting in `Idle`
    pub fn new() -> Self {
        let (current, _) = watch::channel(FlowState::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            current,
            transitions,
        }
    }

    /// Current state
    pub fn current(&self) -> FlowState {
        *self.current.borrow()
    }

    /// Move to a new state and publish the transition
    pub fn set(&self, state: FlowState) {
        let previous = self.current.send_replace(state);
        if previous != state {
            tracing::debug!("Flow state {} -> {}", previous, state);
            let _ = self.transitions.send(state);
        }
    }

    /// Receive every subsequent transition
    pub fn subscribe(&self) -> broadcast::Receiver<FlowState> {
        self.transitions.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_are_published_in_order() {
        let tracker = FlowStateTracker::new();
        let mut rx = tracker.subscribe();

        tracker.set(FlowState::Uploading);
        tracker.set(FlowState::Uploading);
        tracker.set(FlowState::Polling);
        tracker.set(FlowState::Done(FlowOutcome::Failure));
        tracker.set(FlowState::Idle);

        let mut seen = Vec::new();
        while let Ok(state) = rx.try_recv() {
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                FlowState::Uploading,
                FlowState::Polling,
                FlowState::Done(FlowOutcome::Failure),
                FlowState::Idle
            ]
        );
        assert_eq!(tracker.current(), FlowState::Idle);
    }

    #[test]
    fn test_active_states() {
        assert!(!FlowState::Idle.is_active());
        assert!(FlowState::Polling.is_active());
        assert!(!FlowState::Done(FlowOutcome::Success).is_active());
        assert_eq!(FlowState::Done(FlowOutcome::Success).to_string(), "done (success)");
    }
}
