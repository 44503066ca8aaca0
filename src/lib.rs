//! Sanitize Client Library
//!
//! A Rust library for submitting files to a remote content-sanitization
//! service, waiting for the job to finish and saving the cleaned result.
//! The upload flow is driven by a single coordinator that owns one progress
//! surface and never runs two uploads at once.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod settings;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
