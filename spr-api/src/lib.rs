//! Core types and the results-service query surface.
//!
//! This crate provides:
//! - `model`: reference lists, ranking snapshots and aggregate summaries
//! - `wire`: normalization of loosely shaped payloads at the ingestion boundary
//! - `service`: the `ResultsService` trait consumed by the comparison layer
//! - `memory`: an in-memory service backed by fixture data
//! - `client`: the HTTP service (behind the `api` feature)

pub mod error;
pub mod memory;
pub mod model;
pub mod service;
pub mod wire;

#[cfg(feature = "api")]
pub mod client;

pub use error::{Result, ServiceError};
pub use service::{ResultsService, SnapshotQuery};
