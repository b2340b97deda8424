//! Sensor registry backend.
//!
//! Canonical sensor metadata lives in Postgres, a per-type projection of it in
//! MongoDB and the latest telemetry reading of each sensor in Redis. The
//! [`service::SensorService`] ties the three together.

pub mod cache;
pub mod config;
pub mod db;
pub mod documents;
pub mod errors;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod mqtt;
pub mod rest;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod validate;

pub use errors::{Error, Result};
pub use service::SensorService;
