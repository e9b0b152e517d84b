//! HTTP service for the passcode relay.
//!
//! ## Structure
//!
//! - [`handler`] - axum router, shared state, and request handlers.
//! - [`ingest`] - turns inbound SMS webhooks into store batches.
//! - [`dispense`] - hands the next passcode to an allowed caller.
//! - [`origin`] - allowed-origin policy for dispense requests.

pub mod dispense;
pub mod handler;
pub mod ingest;
pub mod origin;

/// Store implementation shared by both adapters.
///
/// File-backed, so its operations block and must run off the async executor.
pub type Store = passcode::CodeStore<passcode::FileMedium>;
