use derive_more::{Display, Error};
use log::error;
use ntex::{http, web};

use super::ReturnData;
use crate::api::errors::{
    DispatchError, LookupError, RetractionError, SignatureError, UploadError, UpstreamError,
    ValidationError,
};

/// Every failure an admin or webhook endpoint can answer with.
#[derive(Debug, Display, Error)]
pub enum ApiError {
    #[display("operator session is missing or expired")]
    Unauthorized,
    #[display("{_0}")]
    Validation(ValidationError),
    #[display("{_0}")]
    Signature(SignatureError),
    #[display("malformed request: {_0}")]
    BadRequest(#[error(not(source))] String),
    #[display("{_0}")]
    NotFound(#[error(not(source))] String),
    #[display("platform rejected the request ({code}): {reason}")]
    Rejected { code: i64, reason: String },
    #[display("{_0}")]
    Upstream(UpstreamError),
    #[display("internal error")]
    Internal(#[error(not(source))] String),
}

impl web::error::WebResponseError for ApiError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        match self {
            ApiError::Internal(details) => error!("[InternalServerError] {}", details),
            _ => error!("{:?}", self),
        }

        web::HttpResponse::build(self.status_code()).json(&ReturnData {
            code: -1,
            msg: self.to_string(),
            data: (),
        })
    }

    fn status_code(&self) -> http::StatusCode {
        match self {
            ApiError::Unauthorized => http::StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::BadRequest(_) => http::StatusCode::BAD_REQUEST,
            ApiError::Signature(_) => http::StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => http::StatusCode::NOT_FOUND,
            ApiError::Upstream(UpstreamError::RateLimited) => http::StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(UpstreamError::Timeout) => http::StatusCode::GATEWAY_TIMEOUT,
            ApiError::Rejected { .. } | ApiError::Upstream(_) => http::StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        ApiError::Signature(err)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(err) => ApiError::Validation(err),
            UploadError::Rejected { code, reason } => ApiError::Rejected { code, reason },
            UploadError::Upstream(err) => ApiError::Upstream(err),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Validation(err) => ApiError::Validation(err),
            DispatchError::Rejected { code, reason } => ApiError::Rejected { code, reason },
            DispatchError::Upstream(err) => ApiError::Upstream(err),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound => ApiError::NotFound(err.to_string()),
            LookupError::Upstream(err) => ApiError::Upstream(err),
        }
    }
}

impl From<RetractionError> for ApiError {
    fn from(err: RetractionError) -> Self {
        match err {
            RetractionError::Validation(err) => ApiError::Validation(err),
            RetractionError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RetractionError::Rejected { code, reason } => ApiError::Rejected { code, reason },
            RetractionError::Upstream(err) => ApiError::Upstream(err),
        }
    }
}
