//! Webhook handlers for the messaging platform
//!
//! ## Modules
//!
//! - [`wechat`] - Official account webhook: handshake and event receipt

pub mod routes;
pub mod wechat;
