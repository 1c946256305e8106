//! # Access Token Manager
//!
//! Process-wide cache of the platform access token. The manager is a cheap
//! cloneable handle: every clone shares the same cache, so one instance built
//! at start-up is handed to every component that performs authenticated calls.
//!
//! Refreshes are single-flight. The first caller that finds the cached token
//! stale starts the refresh; callers arriving while it is in flight await the
//! same shared future and get the same outcome, success or failure.

use chrono::{DateTime, TimeDelta, Utc};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::errors::UpstreamError;
use crate::{metric, models::token::AccessToken, services::ImplCredentialSource};

type RefreshFuture = Shared<BoxFuture<'static, Result<AccessToken, UpstreamError>>>;

/// App credentials used to obtain access tokens.
#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub app_secret: String,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AccessTokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    source: ImplCredentialSource,
    credentials: AppCredentials,
    safety_margin: TimeDelta,
    cached: RwLock<Option<AccessToken>>,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl AccessTokenManager {
    pub fn new(
        source: ImplCredentialSource,
        credentials: AppCredentials,
        safety_margin: TimeDelta,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                credentials,
                safety_margin,
                cached: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Returns a token that is valid for at least the safety margin,
    /// refreshing it first when needed.
    pub async fn get_valid_token(&self) -> Result<AccessToken, UpstreamError> {
        if let Some(token) = self.inner.fresh_cached().await {
            return Ok(token);
        }

        let refresh = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(refresh) => refresh.clone(),
                None => {
                    // a refresh may have completed while we waited for the slot
                    if let Some(token) = self.inner.fresh_cached().await {
                        return Ok(token);
                    }

                    let inner = Arc::clone(&self.inner);
                    let refresh = async move {
                        let result = inner.refresh().await;
                        // cleared before resolving, a finished refresh is never
                        // handed out again
                        *inner.in_flight.lock().await = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Marks `token` stale when it is still the cached one, so the next
    /// [`get_valid_token`](Self::get_valid_token) refreshes it.
    pub async fn invalidate(&self, token: &AccessToken) {
        let mut cached = self.inner.cached.write().await;
        if let Some(current) = cached.as_mut() {
            if current.value == token.value {
                current.expires_at = DateTime::<Utc>::MIN_UTC;
            }
        }
    }
}

impl Inner {
    async fn fresh_cached(&self) -> Option<AccessToken> {
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh(Utc::now(), self.safety_margin))
            .cloned()
    }

    async fn refresh(&self) -> Result<AccessToken, UpstreamError> {
        info!("refreshing platform access token");

        let issued = match self
            .source
            .fetch_access_token(&self.credentials.app_id, &self.credentials.app_secret)
            .await
        {
            Ok(issued) => issued,
            Err(err) => {
                // the previous value stays cached, a later call retries
                let err = UpstreamError::from(err);
                warn!("access token refresh failed: {}", err);
                metric::incr_token_refresh_statds("failed");
                return Err(err);
            }
        };

        let token = AccessToken {
            value: issued.access_token,
            expires_at: Utc::now() + TimeDelta::seconds(issued.expires_in),
        };
        *self.cached.write().await = Some(token.clone());
        metric::incr_token_refresh_statds("refreshed");

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::errors::PlatformError,
        services::{CredentialSource, MockCredentialSource, wechat::schemas::IssuedToken},
    };
    use async_trait::async_trait;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    fn credentials() -> AppCredentials {
        AppCredentials {
            app_id: "wx-app".into(),
            app_secret: "wx-secret".into(),
        }
    }

    fn issued(value: &str, expires_in: i64) -> IssuedToken {
        IssuedToken {
            access_token: value.to_string(),
            expires_in,
        }
    }

    fn manager(source: impl CredentialSource + 'static) -> AccessTokenManager {
        AccessTokenManager::new(Arc::new(source), credentials(), TimeDelta::seconds(300))
    }

    /// Credential source that answers slowly and counts its calls
    struct SlowSource {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl CredentialSource for SlowSource {
        async fn fetch_access_token(
            &self,
            _app_id: &str,
            _app_secret: &str,
        ) -> Result<IssuedToken, PlatformError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(PlatformError::Timeout);
            }
            Ok(issued(&format!("tok-{call}"), 7200))
        }
    }

    #[ntex::test]
    async fn test_cached_token_is_reused() {
        let mut source = MockCredentialSource::new();
        source
            .expect_fetch_access_token()
            .withf(|app_id, app_secret| app_id == "wx-app" && app_secret == "wx-secret")
            .times(1)
            .returning(|_, _| Ok(issued("tok-1", 7200)));
        let manager = manager(source);

        let first = manager.get_valid_token().await.unwrap();
        let second = manager.get_valid_token().await.unwrap();

        assert_eq!(first.value, "tok-1");
        assert_eq!(first, second);
    }

    #[ntex::test]
    async fn test_token_inside_safety_margin_is_refreshed() {
        let mut source = MockCredentialSource::new();
        // expires in 60s, below the 300s safety margin
        source
            .expect_fetch_access_token()
            .times(2)
            .returning(|_, _| Ok(issued("short-lived", 60)));
        let manager = manager(source);

        manager.get_valid_token().await.unwrap();
        manager.get_valid_token().await.unwrap();
    }

    #[ntex::test]
    async fn test_failed_refresh_keeps_previous_token() {
        let mut source = MockCredentialSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_access_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(issued("tok-1", 7200)));
        source
            .expect_fetch_access_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(PlatformError::Api {
                    code: 45009,
                    message: "reach max api daily quota limit".into(),
                })
            });
        source
            .expect_fetch_access_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(issued("tok-2", 7200)));
        let manager = manager(source);

        let first = manager.get_valid_token().await.unwrap();
        manager.invalidate(&first).await;

        let failed = manager.get_valid_token().await;
        assert_eq!(failed, Err(UpstreamError::RateLimited));
        assert_eq!(
            manager.inner.cached.read().await.as_ref().map(|t| t.value.clone()),
            Some("tok-1".to_string())
        );

        let retried = manager.get_valid_token().await.unwrap();
        assert_eq!(retried.value, "tok-2");
    }

    #[ntex::test]
    async fn test_invalidate_ignores_outdated_token() {
        let mut source = MockCredentialSource::new();
        source
            .expect_fetch_access_token()
            .times(1)
            .returning(|_, _| Ok(issued("tok-1", 7200)));
        let manager = manager(source);

        manager.get_valid_token().await.unwrap();
        let outdated = AccessToken {
            value: "tok-0".into(),
            expires_at: Utc::now(),
        };
        manager.invalidate(&outdated).await;

        assert_eq!(manager.get_valid_token().await.unwrap().value, "tok-1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = Arc::new(SlowSource {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
            fail: false,
        });
        let manager =
            AccessTokenManager::new(source.clone(), credentials(), TimeDelta::seconds(300));

        let handles = (0..32)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_valid_token().await })
            })
            .collect::<Vec<_>>();

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap().unwrap().value);
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|value| value == "tok-0"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_failure() {
        let source = Arc::new(SlowSource {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
            fail: true,
        });
        let manager =
            AccessTokenManager::new(source.clone(), credentials(), TimeDelta::seconds(300));

        let handles = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_valid_token().await })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(UpstreamError::Timeout));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_on_expired_token_share_one_refresh() {
        let source = Arc::new(SlowSource {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
            fail: false,
        });
        let manager =
            AccessTokenManager::new(source.clone(), credentials(), TimeDelta::seconds(300));
        *manager.inner.cached.write().await = Some(AccessToken {
            value: "expired".into(),
            expires_at: Utc::now() - TimeDelta::seconds(1),
        });

        let handles = (0..32)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_valid_token().await })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().value, "tok-0");
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(manager.inner.in_flight.lock().await.is_none());
    }

    #[ntex::test]
    async fn test_refresh_finished_without_awaiters_is_not_reused() {
        let mut source = MockCredentialSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_access_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(issued("tok-1", 7200)));
        source
            .expect_fetch_access_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(issued("tok-2", 7200)));
        let manager = manager(source);

        // holding a read guard parks the refresh right before it caches
        let reader = manager.inner.cached.read().await;
        let mut call = Box::pin(manager.get_valid_token());
        assert!(futures::poll!(call.as_mut()).is_pending());

        let refresh = manager.inner.in_flight.lock().await.clone().unwrap();
        drop(call);
        drop(reader);

        assert_eq!(refresh.await.unwrap().value, "tok-1");
        assert!(manager.inner.in_flight.lock().await.is_none());

        let cached = manager.get_valid_token().await.unwrap();
        manager.invalidate(&cached).await;
        assert_eq!(manager.get_valid_token().await.unwrap().value, "tok-2");
    }
}
