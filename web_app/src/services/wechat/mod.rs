//! WeChat official account integration
//!
//! - [`client`] - HTTP client implementing [`PlatformApi`](super::PlatformApi) and
//!   [`CredentialSource`](super::CredentialSource)
//! - [`schemas`] - request and response payloads of the platform API

pub mod client;
pub mod schemas;

pub use client::WechatClient;
