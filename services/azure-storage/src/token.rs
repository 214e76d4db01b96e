// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use azsign_core::time::{now, DateTime};
use azsign_core::utils::Redact;
use azsign_core::{Context, Error, Result};
use chrono::TimeDelta;
use log::debug;
use tokio::sync::RwLock;

/// Tokens are refreshed once they are this close to expiry.
pub const REFRESH_WINDOW_SECS: i64 = 300;

/// An OAuth bearer token together with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The opaque bearer token.
    pub access_token: String,
    /// The instant after which the token is rejected by the service.
    pub expires_on: DateTime,
}

impl AccessToken {
    /// Create a new access token.
    pub fn new(access_token: impl Into<String>, expires_on: DateTime) -> Self {
        Self {
            access_token: access_token.into(),
            expires_on,
        }
    }

    /// Whether the token may still be handed out at `at`, keeping `window`
    /// of headroom before expiry.
    pub fn is_fresh_at(&self, at: DateTime, window: TimeDelta) -> bool {
        !self.access_token.is_empty()
            && at
                .checked_add_signed(window)
                .is_some_and(|deadline| deadline < self.expires_on)
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &Redact::from(&self.access_token))
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// ProvideToken fetches a fresh [`AccessToken`] from an identity endpoint.
///
/// Implementations perform network I/O through [`Context::http_send`] and
/// must not cache; caching is the job of [`TokenCache`].
#[async_trait]
pub trait ProvideToken: Debug + Send + Sync + 'static {
    /// Fetch a new access token.
    async fn provide_token(&self, ctx: &Context) -> Result<AccessToken>;
}

/// TokenCache keeps the last token fetched by a provider and refreshes it
/// shortly before it expires.
///
/// Cloning a cache is cheap and every clone shares the same cached token.
///
/// Refresh is single-flight: when many callers find the token stale at the
/// same time, one of them fetches while the rest wait and then reuse the
/// result. A failed fetch leaves the previous token in place and the error
/// goes to the caller that attempted it.
pub struct TokenCache<P> {
    provider: Arc<P>,
    refresh_window: TimeDelta,
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl<P> Clone for TokenCache<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            refresh_window: self.refresh_window,
            token: self.token.clone(),
        }
    }
}

impl<P: Debug> Debug for TokenCache<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("provider", &self.provider)
            .field("refresh_window", &self.refresh_window)
            .finish_non_exhaustive()
    }
}

impl<P: ProvideToken> TokenCache<P> {
    /// Create a new, empty cache in front of `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            refresh_window: TimeDelta::seconds(REFRESH_WINDOW_SECS),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Override how long before expiry the token gets refreshed.
    pub fn with_refresh_window(mut self, refresh_window: TimeDelta) -> Self {
        self.refresh_window = refresh_window;
        self
    }

    /// The provider this cache fetches from.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Return a token that stays valid for at least the refresh window,
    /// fetching a new one when needed.
    pub async fn get_token(&self, ctx: &Context) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh_at(now(), self.refresh_window) {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if token.is_fresh_at(now(), self.refresh_window) {
                return Ok(token.access_token.clone());
            }
        }

        debug!("access token is absent or about to expire, refreshing");
        let token = self.provider.provide_token(ctx).await?;
        if token.access_token.is_empty() {
            return Err(Error::token_fetch(
                "identity endpoint returned an empty access token",
            ));
        }
        debug!("access token refreshed, expires on {}", token.expires_on);

        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    #[cfg(test)]
    pub(crate) async fn cached(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azsign_core::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct CountingProvider {
        calls: AtomicUsize,
        ttl: TimeDelta,
        fail_from: Option<usize>,
        delay: Option<Duration>,
        empty: bool,
    }

    impl CountingProvider {
        fn new(ttl: TimeDelta) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                ttl,
                fail_from: None,
                delay: None,
                empty: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProvideToken for CountingProvider {
        async fn provide_token(&self, _: &Context) -> Result<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_from.is_some_and(|from| n >= from) {
                return Err(Error::token_fetch("endpoint unavailable"));
            }
            if self.empty {
                return Ok(AccessToken::new("", now() + self.ttl));
            }

            Ok(AccessToken::new(format!("token-{n}"), now() + self.ttl))
        }
    }

    fn minutes(m: i64) -> TimeDelta {
        TimeDelta::try_minutes(m).expect("in bounds")
    }

    /// Larger than any span a `DateTime` can represent.
    fn unbounded() -> TimeDelta {
        TimeDelta::try_seconds(i64::MAX / 1000).expect("in bounds")
    }

    #[tokio::test]
    async fn test_token_outside_window_is_reused() {
        let cache = TokenCache::new(CountingProvider::new(minutes(6)));
        let ctx = Context::new();

        assert_eq!(cache.get_token(&ctx).await.unwrap(), "token-0");
        assert_eq!(cache.get_token(&ctx).await.unwrap(), "token-0");
        assert_eq!(cache.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_token_inside_window_is_refreshed() {
        let cache = TokenCache::new(CountingProvider::new(minutes(4)));
        let ctx = Context::new();

        assert_eq!(cache.get_token(&ctx).await.unwrap(), "token-0");
        assert_eq!(cache.get_token(&ctx).await.unwrap(), "token-1");
        assert_eq!(cache.provider().calls(), 2);
    }

    #[tokio::test]
    async fn test_custom_refresh_window() {
        let cache =
            TokenCache::new(CountingProvider::new(minutes(4))).with_refresh_window(minutes(1));
        let ctx = Context::new();

        cache.get_token(&ctx).await.unwrap();
        cache.get_token(&ctx).await.unwrap();
        assert_eq!(cache.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_token() {
        let mut provider = CountingProvider::new(minutes(4));
        provider.fail_from = Some(1);
        let cache = TokenCache::new(provider);
        let ctx = Context::new();

        assert_eq!(cache.get_token(&ctx).await.unwrap(), "token-0");
        let before = cache.cached().await.unwrap();

        let err = cache.get_token(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenFetch);
        assert!(err.is_retryable());
        assert_eq!(cache.cached().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_first_fetch_failure_leaves_cache_empty() {
        let mut provider = CountingProvider::new(minutes(60));
        provider.fail_from = Some(0);
        let cache = TokenCache::new(provider);

        assert!(cache.get_token(&Context::new()).await.is_err());
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let mut provider = CountingProvider::new(minutes(60));
        provider.empty = true;
        let cache = TokenCache::new(provider);

        let err = cache.get_token(&Context::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenFetch);
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_is_single_flight() {
        let mut provider = CountingProvider::new(minutes(60));
        provider.delay = Some(Duration::from_millis(50));
        let cache = TokenCache::new(provider);
        let ctx = Context::new();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move { cache.get_token(&ctx).await });
        }
        while let Some(res) = tasks.join_next().await {
            assert_eq!(res.unwrap().unwrap(), "token-0");
        }

        assert_eq!(cache.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_refresh_window_always_refreshes() {
        let cache =
            TokenCache::new(CountingProvider::new(minutes(60))).with_refresh_window(unbounded());
        let ctx = Context::new();

        assert_eq!(cache.get_token(&ctx).await.unwrap(), "token-0");
        assert_eq!(cache.get_token(&ctx).await.unwrap(), "token-1");
        assert_eq!(cache.provider().calls(), 2);
    }

    #[test]
    fn test_is_fresh_at_boundary() {
        let at = now();
        let token = AccessToken::new("t", at + minutes(5));

        assert!(!token.is_fresh_at(at, minutes(5)));
        assert!(token.is_fresh_at(at, minutes(4)));
        assert!(!token.is_fresh_at(at, unbounded()));
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::new("eyJ0eXAiOiJKV1QiLCJhbGciOi", now());
        let debug = format!("{token:?}");
        assert!(!debug.contains("eyJ0eXAiOiJKV1QiLCJhbGciOi"), "{debug}");
    }
}
