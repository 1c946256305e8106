//! Operator facing HTTP surface. Every endpoint answers with the
//! [`ReturnData`] envelope.

pub mod announcement;
pub mod errors;
pub mod routes;
pub mod session;
pub mod utils;

use ntex::web;
use serde::Serialize;

use crate::{api::Platform, repo};

pub struct AppState {
    pub repo: repo::ImplAppRepo,
    pub platform: Platform,
    /// Token shared with the platform to sign webhook requests
    pub webhook_token: String,
}

/// Response envelope: `code` is 0 on success and -1 on failure.
#[derive(Debug, Serialize)]
pub struct ReturnData<T: Serialize> {
    pub code: i32,
    pub msg: String,
    pub data: T,
}

/// 200 response carrying `data` in the envelope
pub fn ok_response<T: Serialize>(data: T) -> web::HttpResponse {
    web::HttpResponse::Ok().json(&ReturnData {
        code: 0,
        msg: "OK".to_string(),
        data,
    })
}
