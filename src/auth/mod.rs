//! Access token lifecycle
//!
//! Tokens are cached on disk per profile and only re-fetched from the
//! WeCom token endpoint when the cached one is missing or expired.

mod error;
mod file_store;
mod provider;
mod tokens;

pub use error::{StoreError, TokenError};
pub use file_store::FileTokenStore;
pub use provider::TokenProvider;
pub use tokens::{CachedToken, TokenStore};
