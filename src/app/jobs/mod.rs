//! Job lifecycle: submission and status polling
//!
//! Downloads live with the HTTP client in [`crate::app::client::download`].

pub mod poller;
pub mod submission;

pub use poller::{classify, JobStatusSource, PollConfig, PollReport, StatusPoller, TickOutcome};
pub use submission::{BatchNamer, JobSubmitter, SubmitRequest};
