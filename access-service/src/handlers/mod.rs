//! HTTP handlers for access-service.

pub mod access;
pub mod metrics;
pub mod session;
