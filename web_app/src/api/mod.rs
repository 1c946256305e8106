//! # API Module
//!
//! Business operations of the broadcast gateway. Each submodule handles one
//! concern and talks to the platform through a shared [`Platform`] handle.
//!
//! ## Modules
//!
//! - [`broadcast`] - Validation, composition and dispatch of broadcasts
//! - [`errors`] - Error taxonomy shared by every operation
//! - [`media`] - Media asset uploads
//! - [`retraction`] - Retraction of single articles from news broadcasts
//! - [`status`] - Delivery status lookups
//! - [`token`] - Access token cache with single-flight refresh

pub mod broadcast;
pub mod errors;
pub mod media;
pub mod retraction;
pub mod status;
pub mod token;

use std::future::Future;

use crate::{models::token::AccessToken, services::ImplPlatformApi};
use errors::{PlatformError, UpstreamError};
use token::AccessTokenManager;

/// Platform client paired with the token cache it authenticates with.
#[derive(Clone)]
pub struct Platform {
    pub api: ImplPlatformApi,
    pub tokens: AccessTokenManager,
}

impl Platform {
    pub fn new(api: ImplPlatformApi, tokens: AccessTokenManager) -> Self {
        Self { api, tokens }
    }

    /// Runs `op` with a valid access token. When the platform answers that
    /// the token expired, the token is invalidated and `op` runs exactly one
    /// more time with a fresh one.
    pub async fn with_token<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: Fn(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, PlatformError>>,
        E: From<PlatformError> + From<UpstreamError>,
    {
        let token = self.tokens.get_valid_token().await?;
        match op(token.clone()).await {
            Err(err) if err.is_auth_expired() => {
                tracing::warn!("access token rejected by platform, refreshing once");
                self.tokens.invalidate(&token).await;
                let token = self.tokens.get_valid_token().await?;
                Ok(op(token).await?)
            }
            other => Ok(other?),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers shared by the operation tests.

    use super::*;
    use crate::{
        api::token::AppCredentials,
        services::{MockCredentialSource, MockPlatformApi, wechat::schemas::IssuedToken},
    };
    use chrono::TimeDelta;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Builds a [`Platform`] over `api` whose credential source hands out
    /// `tok-1`, `tok-2`, ... on successive refreshes.
    pub fn platform(api: MockPlatformApi) -> Platform {
        let issued = Arc::new(AtomicUsize::new(0));
        let mut source = MockCredentialSource::new();
        source.expect_fetch_access_token().returning(move |_, _| {
            let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken {
                access_token: format!("tok-{n}"),
                expires_in: 7200,
            })
        });

        let tokens = AccessTokenManager::new(
            Arc::new(source),
            AppCredentials {
                app_id: "wx-app".into(),
                app_secret: "wx-secret".into(),
            },
            TimeDelta::seconds(300),
        );
        Platform::new(Arc::new(api), tokens)
    }
}
