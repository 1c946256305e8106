//! Application configuration.
//!
//! Every value is read from the environment once at start-up by
//! [`init_config`]. Fields marked SENSITIVE must never be logged.

use chrono::TimeDelta;
use envconfig::Envconfig;
use std::{sync::OnceLock, time::Duration};

#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Database host value (NON-SENSITIVE)
    /// Example: "sqlite:data/gateway.db"
    pub db_host: String,

    /// 🔒 SENSITIVE: Database password to encrypt SQLite data (prod only)
    #[envconfig(default = "")]
    pub db_pass_encrypt: String,

    /// Host address for web server binding (NON-SENSITIVE)
    pub wep_server_host: String,

    /// Port for web server binding (NON-SENSITIVE)
    pub wep_server_port: u16,

    /// Path to SSL private key file (SENSITIVE PATH)
    #[envconfig(default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE)
    #[envconfig(default = "server.crt")]
    pub certificate_path: String,

    /// Origin of the operator console allowed by CORS (NON-SENSITIVE)
    /// Example: "https://console.example.com"
    #[envconfig(default = "http://localhost:8080")]
    pub admin_allowed_origin: String,

    /// 🔒 SENSITIVE: Logfire write token. Without it logs go to stdout.
    pub logfire_token: Option<String>,

    /// Official account app id (NON-SENSITIVE)
    pub wechat_app_id: String,

    /// 🔒 SENSITIVE: Official account app secret
    pub wechat_app_secret: String,

    /// 🔒 SENSITIVE: Token shared with the platform to sign webhook requests
    pub wechat_webhook_token: String,

    /// Platform API base url (NON-SENSITIVE)
    #[envconfig(default = "https://api.weixin.qq.com")]
    pub wechat_api_base: String,

    /// Timeout applied to every platform call, in seconds
    #[envconfig(default = "10")]
    pub wechat_timeout_secs: u64,

    /// An access token is refreshed this many seconds before it expires
    #[envconfig(default = "300")]
    pub wechat_token_safety_margin_secs: i64,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    pub fn wechat_timeout(&self) -> Duration {
        Duration::from_secs(self.wechat_timeout_secs)
    }

    pub fn token_safety_margin(&self) -> TimeDelta {
        TimeDelta::seconds(self.wechat_token_safety_margin_secs)
    }
}

/// Global application configuration, set once by [`init_config`]
pub static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Loads the configuration from the environment.
pub fn init_config() -> anyhow::Result<()> {
    let app_config = AppConfig::init_from_env()?;

    if app_config.is_prod() && app_config.db_pass_encrypt.is_empty() {
        anyhow::bail!("DB_PASS_ENCRYPT is required in prod");
    }

    APP_CONFIG
        .set(app_config)
        .map_err(|_| anyhow::anyhow!("app config already initialized"))
}
