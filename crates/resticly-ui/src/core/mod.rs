//! Framework-agnostic state shared by every Resticly front end.

pub mod in_flight;
pub mod notify;
pub mod poller;
pub mod refresh;
pub mod theme;
