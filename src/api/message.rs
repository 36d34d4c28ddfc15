//! Application text messages

use anyhow::{bail, Result};

use super::client::WeComClient;
use crate::models::{SendMsgRequest, SendMsgResponse};

/// Send `content` to `users` as application `agent_id`.
///
/// A non-zero `errcode` is an error. Recipients the provider could not
/// reach are logged; the message still went to everyone else.
pub async fn send_text(
    client: &WeComClient,
    access_token: &str,
    agent_id: i64,
    users: &[String],
    content: &str,
) -> Result<SendMsgResponse> {
    if users.iter().all(|u| u.trim().is_empty()) {
        bail!("No recipients given");
    }

    let request = SendMsgRequest::text(agent_id, users, content);
    let resp = client.send_message(access_token, &request).await?;

    if !resp.status.is_ok() {
        bail!(
            "Send message failed (errcode {}): {}",
            resp.status.errcode,
            resp.status.errmsg
        );
    }
    if !resp.invaliduser.is_empty() {
        tracing::warn!("Message not delivered to: {}", resp.invaliduser);
    }

    Ok(resp)
}
