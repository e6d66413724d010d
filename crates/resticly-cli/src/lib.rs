#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::redundant_pub_crate, clippy::module_name_repetitions)]

//! Command-line front end for a Resticly server.
//!
//! Layout:
//! - `cli.rs`: argument parsing and command dispatch
//! - `client.rs`: context construction and CLI errors
//! - `commands/`: command handlers grouped by page
//! - `console.rs`: notification printer and in-flight spinner
//! - `views.rs`: refreshable list views and the page table
//! - `output.rs`: renderers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod console;
pub(crate) mod output;
pub(crate) mod views;

pub use cli::run;
