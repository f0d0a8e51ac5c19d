//! Backend access.
//!
//! This module provides the HTTP client used to query the records backend.

pub mod client;

pub use client::{classify, ClientConfig, FetchError, FetchOutcome, RecordClient};
