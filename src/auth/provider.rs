//! Cache-first access token acquisition
//!
//! A cached token is returned without touching the network while it is
//! still valid. Anything else (missing, unreadable, corrupt or expired
//! cache, or an explicit bypass) falls through to the token endpoint, and
//! the fresh token is written back for the next invocation.

use chrono::{Duration, Utc};

use super::{CachedToken, StoreError, TokenError, TokenStore};
use crate::api::client::{redact, WeComClient};
use crate::config::ProfileCredentials;

pub struct TokenProvider<S> {
    store: S,
    client: WeComClient,
    safety_margin: Duration,
}

impl<S: TokenStore> TokenProvider<S> {
    pub fn new(store: S, client: WeComClient) -> Self {
        Self {
            store,
            client,
            safety_margin: Duration::zero(),
        }
    }

    /// Treat cached tokens as expired `margin` before their real expiry.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Return a currently valid access token for `profile`.
    ///
    /// With `bypass_cache` the cache is neither read nor written.
    #[tracing::instrument(level = "debug", skip(self, credentials))]
    pub async fn get_token(
        &self,
        profile: &str,
        credentials: &ProfileCredentials,
        bypass_cache: bool,
    ) -> Result<String, TokenError> {
        if !bypass_cache {
            if let Some(cached) = self.cached(profile) {
                return Ok(cached.token);
            }
        }

        if !credentials.is_complete() {
            return Err(TokenError::InvalidCredentials {
                profile: profile.to_string(),
            });
        }

        tracing::info!(
            "Fetching access token for profile {} (corp {})",
            profile,
            redact(&credentials.corp_id)
        );
        let response = self.client.fetch_token(credentials).await?;
        if !response.status.is_ok() {
            return Err(TokenError::Rejected {
                code: response.status.errcode,
                message: response.status.errmsg,
            });
        }
        if response.access_token.is_empty() {
            return Err(TokenError::Decode(
                "response carries no access_token".to_string(),
            ));
        }
        if response.expires_in <= 0 {
            return Err(TokenError::Decode(format!(
                "non-positive expires_in {}",
                response.expires_in
            )));
        }

        let expires_in = response.expires_in;
        let fresh = CachedToken::issued(response.access_token, expires_in, Utc::now())
            .ok_or_else(|| TokenError::Decode(format!("expires_in {} out of range", expires_in)))?;
        tracing::debug!("Access token valid until {}", fresh.expires_at);

        if !bypass_cache {
            // Token is still usable for this run even if it can't be cached
            if let Err(e) = self.store.save(profile, &fresh) {
                tracing::warn!("{}", e);
            }
        }

        Ok(fresh.token)
    }

    /// Valid at `now + safety_margin`; a margin past the end of time means never.
    fn usable(&self, token: &CachedToken) -> bool {
        Utc::now()
            .checked_add_signed(self.safety_margin)
            .map_or(false, |at| token.is_valid(at))
    }

    /// Cached token still valid (with margin) at the current time.
    fn cached(&self, profile: &str) -> Option<CachedToken> {
        match self.store.load(profile) {
            Ok(token) if self.usable(&token) => {
                tracing::debug!("Using cached access token (expires {})", token.expires_at);
                Some(token)
            }
            Ok(token) => {
                tracing::debug!("Cached access token expired at {}", token.expires_at);
                None
            }
            Err(e @ StoreError::NotFound { .. }) => {
                tracing::debug!("{}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring token cache: {}", e);
                None
            }
        }
    }
}
