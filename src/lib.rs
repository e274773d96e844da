//! Battery OS API
//!
//! Battery diagnostics, alert thresholds and mock telemetry over HTTP, with
//! a pass-through to an external documentation service.

pub mod alerts;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod metrics;
pub mod proxy;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod validation;
