//! WeChat official account webhook
//!
//! ## Submodules
//!
//! - [`routes`] - HTTP endpoint handlers
//! - [`security`] - Request signature verification

pub mod routes;
pub mod security;

pub use routes::{receive, verify};
