//! Token endpoint models

use serde::{Deserialize, Serialize};

/// Status block carried by every WeCom API response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl ApiStatus {
    pub fn ok() -> Self {
        Self {
            errcode: 0,
            errmsg: "ok".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errcode == 0
    }
}

/// Response from `/cgi-bin/gettoken`
///
/// `access_token` and `expires_in` are only meaningful when `errcode == 0`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(flatten)]
    pub status: ApiStatus,
    #[serde(default)]
    pub access_token: String,
    /// Lifetime in seconds, relative to the time of issue
    #[serde(default)]
    pub expires_in: i64,
}
