//! Cached token model and storage trait

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::StoreError;

/// Access token with its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    #[serde(rename = "access_token")]
    pub token: String,
    /// Lifetime the provider granted, in seconds
    pub expires_in: i64,
    #[serde(rename = "expire_time")]
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Token issued at `now` that lives for `expires_in` seconds.
    ///
    /// `None` if the expiry is not representable.
    pub fn issued(token: String, expires_in: i64, now: DateTime<Utc>) -> Option<Self> {
        let expires_at = Duration::try_seconds(expires_in).and_then(|d| now.checked_add_signed(d))?;
        Some(Self {
            token,
            expires_in,
            expires_at,
        })
    }

    /// Usable iff the token is non-empty and `now` is strictly before expiry.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

/// Persistence for one cached token per profile
pub trait TokenStore {
    fn load(&self, profile: &str) -> Result<CachedToken, StoreError>;
    /// Replace the cached entry for `profile` as a whole.
    fn save(&self, profile: &str, token: &CachedToken) -> Result<(), StoreError>;
}
