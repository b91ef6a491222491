//! Axum integration for the club ticket ledger.
//!
//! This crate holds the HTTP shell pieces that are not specific to one
//! domain: the error type handlers return, extractors for the caller and
//! correlation ID, the correlation ID middleware, and health endpoints.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract** the caller, path and JSON body
//! 3. **Build** a domain command from them
//! 4. **Dispatch** it to the ledger
//! 5. **Map** the result or domain error to an HTTP response

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CALLER_HEADER, Caller, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
