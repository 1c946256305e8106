use ntex::web;

use super::errors::ApiError;
use crate::{consts, repo};

fn operator_token(req: &web::HttpRequest) -> Option<&str> {
    req.headers()
        .get(consts::OPERATOR_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Fails unless `token` names an active operator session.
pub async fn check_operator_token(
    token: Option<&str>,
    repo: &repo::ImplAppRepo,
) -> Result<(), ApiError> {
    let Some(token) = token else {
        return Err(ApiError::Unauthorized);
    };

    match repo.is_operator_session_active(token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiError::Unauthorized),
        Err(e) => Err(ApiError::Internal(format!(
            "operator session lookup failed: {}",
            e
        ))),
    }
}

/// Checks the operator `Token` header of an admin request.
pub async fn authorize(req: &web::HttpRequest, repo: &repo::ImplAppRepo) -> Result<(), ApiError> {
    check_operator_token(operator_token(req), repo).await
}
