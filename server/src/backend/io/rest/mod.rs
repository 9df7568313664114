//! # REST API Interface Layer
//!
//! HTTP endpoints for the breeding engine.
//!
//! ## Error translation
//!
//! - `Validation` → 400 Bad Request
//! - `NotFound` → 404 Not Found
//! - `PartialBatchFailure` → 409 Conflict, with the created offspring ids
//! - `Persistence` → 500 Internal Server Error

pub mod breeding_apis;
