//! Request and response bodies.

pub mod access;
pub mod session;
