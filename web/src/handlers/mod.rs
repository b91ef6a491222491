//! HTTP handlers shared by every service.

pub mod health;

pub use health::{health_check, readiness_response};
