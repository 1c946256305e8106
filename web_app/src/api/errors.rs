//! # Gateway Errors
//!
//! Error taxonomy of the broadcast gateway. Caller mistakes
//! ([`ValidationError`]) are always raised before any platform call, so they
//! never leave side effects behind. Platform failures are split between
//! transport level problems ([`UpstreamError`]) and business rejections that
//! carry the platform's own code and reason.

use derive_more::{Display, Error};

use crate::consts;

/// Malformed or incomplete input, found before any network call.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[display("a news broadcast needs at least one article")]
    NoArticles,
    #[display("article {index} has an empty title")]
    EmptyTitle { index: usize },
    #[display("article {index} has an empty media reference")]
    EmptyMediaRef { index: usize },
    #[display("text broadcast body is empty")]
    EmptyText,
    #[display("media handle is empty")]
    EmptyMediaHandle,
    #[display("uploaded content is empty")]
    EmptyContent,
    #[display("unsupported media kind: {_0}")]
    UnsupportedMediaKind(#[error(not(source))] String),
    #[display("broadcast {_0} is not a news broadcast")]
    NotNewsBroadcast(#[error(not(source))] i64),
    #[display("preview recipient is empty")]
    EmptyRecipient,
}

/// Webhook authenticity failure. Carries no detail on purpose.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[display("webhook signature rejected")]
pub struct SignatureError;

/// Network or platform side failure.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[display("platform call timed out")]
    Timeout,
    #[display("platform rate limit reached")]
    RateLimited,
    #[display("platform access token expired")]
    AuthExpired,
    #[display("platform call failed: {reason}")]
    Other { code: Option<i64>, reason: String },
}

impl UpstreamError {
    /// Timeouts and rate limits are worth retrying later, the rest is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UpstreamError::Timeout | UpstreamError::RateLimited)
    }
}

/// Raw failure of one platform call, as produced by a [`PlatformApi`](crate::services::PlatformApi)
/// implementation.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[display("request timed out")]
    Timeout,
    #[display("transport error: {_0}")]
    Transport(#[error(not(source))] String),
    #[display("platform error {code}: {message}")]
    Api { code: i64, message: String },
}

impl PlatformError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, PlatformError::Api { code, .. } if consts::AUTH_EXPIRED_CODES.contains(code))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::Api { code, .. } if consts::NOT_FOUND_CODES.contains(code))
    }

    /// Splits business rejections (`Ok`) from transport level failures (`Err`).
    pub fn into_rejection(self) -> Result<(i64, String), UpstreamError> {
        match self {
            PlatformError::Api { code, message }
                if !consts::AUTH_EXPIRED_CODES.contains(&code)
                    && !consts::RATE_LIMITED_CODES.contains(&code) =>
            {
                Ok((code, message))
            }
            other => Err(other.into()),
        }
    }
}

impl From<PlatformError> for UpstreamError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Timeout => UpstreamError::Timeout,
            PlatformError::Transport(reason) => UpstreamError::Other { code: None, reason },
            PlatformError::Api { code, .. } if consts::AUTH_EXPIRED_CODES.contains(&code) => {
                UpstreamError::AuthExpired
            }
            PlatformError::Api { code, .. } if consts::RATE_LIMITED_CODES.contains(&code) => {
                UpstreamError::RateLimited
            }
            PlatformError::Api { code, message } => UpstreamError::Other {
                code: Some(code),
                reason: message,
            },
        }
    }
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[display("invalid upload: {_0}")]
    Validation(ValidationError),
    #[display("platform rejected upload ({code}): {reason}")]
    Rejected { code: i64, reason: String },
    #[display("{_0}")]
    Upstream(UpstreamError),
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[display("invalid broadcast: {_0}")]
    Validation(ValidationError),
    #[display("platform rejected broadcast ({code}): {reason}")]
    Rejected { code: i64, reason: String },
    #[display("{_0}")]
    Upstream(UpstreamError),
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[display("broadcast not found")]
    NotFound,
    #[display("{_0}")]
    Upstream(UpstreamError),
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum RetractionError {
    #[display("invalid retraction: {_0}")]
    Validation(ValidationError),
    #[display("broadcast {broadcast_id} never had article {article_index}")]
    NotFound { broadcast_id: i64, article_index: u32 },
    #[display("platform rejected retraction ({code}): {reason}")]
    Rejected { code: i64, reason: String },
    #[display("{_0}")]
    Upstream(UpstreamError),
}

macro_rules! impl_operation_error {
    ($error:ident) => {
        impl From<ValidationError> for $error {
            fn from(err: ValidationError) -> Self {
                $error::Validation(err)
            }
        }

        impl From<UpstreamError> for $error {
            fn from(err: UpstreamError) -> Self {
                $error::Upstream(err)
            }
        }

        impl From<PlatformError> for $error {
            fn from(err: PlatformError) -> Self {
                match err.into_rejection() {
                    Ok((code, reason)) => $error::Rejected { code, reason },
                    Err(upstream) => $error::Upstream(upstream),
                }
            }
        }
    };
}

impl_operation_error!(UploadError);
impl_operation_error!(DispatchError);
impl_operation_error!(RetractionError);

impl From<UpstreamError> for LookupError {
    fn from(err: UpstreamError) -> Self {
        LookupError::Upstream(err)
    }
}

impl From<PlatformError> for LookupError {
    fn from(err: PlatformError) -> Self {
        if err.is_not_found() {
            return LookupError::NotFound;
        }
        LookupError::Upstream(err.into())
    }
}
