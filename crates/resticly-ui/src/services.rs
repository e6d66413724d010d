//! Service clients for talking to the Resticly API.

pub mod api;
