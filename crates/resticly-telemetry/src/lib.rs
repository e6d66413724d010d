#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]
//! Logging primitives shared across the Resticly workspace.
//!
//! Front ends call [`init_logging`] once at startup; library crates only emit
//! `tracing` events and never install a subscriber themselves.

pub mod error;
mod init;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
