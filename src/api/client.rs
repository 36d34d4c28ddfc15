//! HTTP client for the WeCom server API
//!
//! Wraps reqwest::Client with a per-request timeout and the two endpoints
//! this tool needs: token issuance and message send.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::auth::TokenError;
use crate::config::ProfileCredentials;
use crate::models::{AccessTokenResponse, SendMsgRequest, SendMsgResponse};

pub const DEFAULT_API_BASE: &str = "https://qyapi.weixin.qq.com";
const TOKEN_PATH: &str = "/cgi-bin/gettoken";
const SEND_PATH: &str = "/cgi-bin/message/send";

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct WeComClient {
    http: reqwest::Client,
    token_url: Url,
    send_url: Url,
}

impl WeComClient {
    /// Build a client for `api_base`; every request is bounded by `timeout`.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(api_base).with_context(|| format!("Invalid API base {}", api_base))?;
        let token_url = base.join(TOKEN_PATH).context("Invalid token URL")?;
        let send_url = base.join(SEND_PATH).context("Invalid send URL")?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            token_url,
            send_url,
        })
    }

    /// Request a fresh access token. Provider-level rejections (non-zero
    /// `errcode`) are returned in the body, not as an error.
    #[tracing::instrument(level = "debug", skip_all, fields(corp_id = %redact(&credentials.corp_id)))]
    pub async fn fetch_token(
        &self,
        credentials: &ProfileCredentials,
    ) -> Result<AccessTokenResponse, TokenError> {
        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("corpid", &credentials.corp_id)
            .append_pair("corpsecret", &credentials.corp_secret);

        tracing::debug!("Requesting access token from {}", self.token_url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TokenError::RemoteStatus {
                status: status.as_u16(),
                body: truncate(body),
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST a message with the given access token.
    pub async fn send_message(
        &self,
        access_token: &str,
        request: &SendMsgRequest,
    ) -> Result<SendMsgResponse> {
        let mut url = self.send_url.clone();
        url.query_pairs_mut().append_pair("access_token", access_token);

        tracing::debug!("Message POST {}", self.send_url);

        let resp = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Message POST {} failed", self.send_url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "HTTP {} for {}: {}",
                status.as_u16(),
                self.send_url,
                truncate(body)
            );
        }

        resp.json()
            .await
            .context("Failed to parse message send response")
    }
}

/// Identifier hint safe for logs: first and last two characters.
pub fn redact(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 4 {
        return format!("{}***", chars.iter().take(1).collect::<String>());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}
