//! Service desk: IT service requests with emailed manager approval.
//!
//! Library crate shared by the `service-desk` binary and the integration
//! tests in `tests/`.

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod notification;
pub mod store;
pub mod workflow;
