//! # Broadcast Gateway
//!
//! Server side gateway for a WeChat official account: verifies the platform
//! webhook, uploads media and broadcasts announcements to every subscriber on
//! behalf of the account operators.
#![recursion_limit = "256"]

pub mod admin;
pub mod api;
pub mod config;
pub mod consts;
pub mod metric;
pub mod models;
pub mod repo;
pub mod services;
pub mod utils;
pub mod webhook;

use anyhow::Context;
use logfire::config::{ConsoleOptions, MetricsOptions, SendToLogfire};
use ntex::web;
use ntex_cors::Cors;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};
use std::sync::Arc;

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Initialize configuration
    config::init_config()?;

    let app_config = config::APP_CONFIG
        .get()
        .context("failed to get app config")?;

    // Initialize logging and metrics
    let shutdown_handler = logfire_config(app_config.logfire_token.as_deref()).finish()?;

    // Initialize database connection pool
    let sqlite_repo = repo::sqlite::SqlxSqliteRepo {
        db_pool: utils::setup_sqlite_db_pool(app_config).await?,
    };

    // One platform handle for the whole process, so every worker shares the
    // same access token cache
    let platform = build_platform(app_config)?;

    configure_and_run_server(sqlite_repo, platform).await?;

    shutdown_handler.shutdown()?;

    Ok(())
}

/// Logfire setup shared by every environment. Records always reach the
/// console and are exported only when a token is configured.
fn logfire_config(token: Option<&str>) -> logfire::LogfireConfigBuilder {
    let config = logfire::configure()
        .install_panic_handler()
        .with_metrics(Some(MetricsOptions::default()))
        .with_console(Some(ConsoleOptions::default()))
        .send_to_logfire(SendToLogfire::IfTokenPresent);

    match token {
        Some(token) => config.with_token(token),
        None => config,
    }
}

/// Builds the platform client and its token cache from the configuration
fn build_platform(app_config: &config::AppConfig) -> anyhow::Result<api::Platform> {
    let wechat_client = Arc::new(services::wechat::WechatClient::new(
        app_config.wechat_api_base.as_str(),
        app_config.wechat_timeout(),
    )?);

    let tokens = api::token::AccessTokenManager::new(
        wechat_client.clone(),
        api::token::AppCredentials {
            app_id: app_config.wechat_app_id.clone(),
            app_secret: app_config.wechat_app_secret.clone(),
        },
        app_config.token_safety_margin(),
    );

    Ok(api::Platform::new(wechat_client, tokens))
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(
    app_config: &config::AppConfig,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .map_err(|e| anyhow::anyhow!("Failed to create SSL acceptor: {}", e))?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load private key from {}: {}",
                app_config.private_key_path,
                e
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load certificate from {}: {}",
                app_config.certificate_path,
                e
            )
        })?;

    Ok(ssl_acceptor)
}

/// Creates application state from the provided services
fn create_app_state(
    sqlite_repo: repo::sqlite::SqlxSqliteRepo,
    platform: api::Platform,
    webhook_token: &str,
) -> admin::AppState {
    admin::AppState {
        repo: Box::new(sqlite_repo),
        platform,
        webhook_token: webhook_token.to_string(),
    }
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(
    sqlite_repo: repo::sqlite::SqlxSqliteRepo,
    platform: api::Platform,
) -> anyhow::Result<()> {
    let app_config = config::APP_CONFIG
        .get()
        .context("failed to get app config")?;
    let server_addr = ("0.0.0.0", app_config.wep_server_port);

    let server = web::server(move || {
        web::App::new()
            .wrap(
                Cors::new()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS", "DELETE"])
                    .allowed_origin(&app_config.admin_allowed_origin)
                    .finish(),
            )
            .wrap(web::middleware::Logger::default())
            .wrap(web::middleware::Compress::default())
            .state(create_app_state(
                sqlite_repo.clone(),
                platform.clone(),
                &app_config.wechat_webhook_token,
            ))
            .configure(webhook::routes::wechat)
            .configure(admin::routes::announcement)
    });

    let bound_server = if app_config.is_prod() {
        let ssl_acceptor = setup_ssl_acceptor(app_config)?;
        server.bind_openssl(server_addr, ssl_acceptor)?
    } else {
        server.bind(server_addr)?
    };

    logfire::info!(
        "broadcast gateway listening on port {port}",
        port = i64::from(app_config.wep_server_port)
    );

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
