//! WeChat webhook endpoint handlers
//!
//! The platform signs every request with the shared webhook token. The GET
//! handshake proves ownership of the server address by echoing `echostr`;
//! POST requests deliver subscriber events that only need acknowledging.

use super::security;
use crate::{
    admin::{AppState, errors::ApiError},
    consts, metric,
};
use ntex::{util::Bytes, web};
use serde::Deserialize;

/// Signature parameters sent on every webhook request
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
    /// Only present on the handshake
    #[serde(default)]
    pub echostr: Option<String>,
}

fn check_signature(query: &WebhookQuery, webhook_token: &str) -> Result<(), ApiError> {
    match security::verify(
        webhook_token,
        &query.timestamp,
        &query.nonce,
        &query.signature,
    ) {
        Ok(()) => {
            metric::incr_webhook_statds("verified");
            Ok(())
        }
        Err(err) => {
            metric::incr_webhook_statds("rejected");
            Err(err.into())
        }
    }
}

/// Handshake endpoint (GET)
///
/// # Returns
/// - 200 with `echostr` as `text/plain` if the signature matches
/// - 403 otherwise
#[web::get("")]
pub async fn verify(
    query: web::types::Query<WebhookQuery>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    check_signature(&query, &app_state.webhook_token)?;

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(query.echostr.clone().unwrap_or_default()))
}

/// Event receipt endpoint (POST)
///
/// The payload is not interpreted; a signed delivery is acknowledged so the
/// platform does not retry it.
#[web::post("")]
pub async fn receive(
    query: web::types::Query<WebhookQuery>,
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let _span = logfire::span!("wechat_webhook").entered();

    check_signature(&query, &app_state.webhook_token)?;

    logfire::info!("webhook event received: {size} bytes", size = body.len() as i64);

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(consts::WEBHOOK_ACK_BODY))
}
