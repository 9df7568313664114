//! # IO Module
//!
//! Interface layer between HTTP clients and the domain services.
//!
//! Translates JSON requests into domain commands and domain results (or
//! errors) into JSON responses with matching status codes. No business rules
//! live here.

pub mod rest;
