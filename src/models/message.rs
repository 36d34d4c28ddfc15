//! Message-send models

use serde::{Deserialize, Serialize};

use super::ApiStatus;

/// Text message body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

/// Body of `POST /cgi-bin/message/send`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMsgRequest {
    /// Recipient user ids joined with `|`
    pub touser: String,
    pub msgtype: String,
    pub agentid: i64,
    pub text: TextContent,
    pub safe: u8,
}

impl SendMsgRequest {
    /// Plain (non-confidential) text message from `agent_id` to `users`.
    pub fn text(agent_id: i64, users: &[String], content: &str) -> Self {
        Self {
            touser: users.join("|"),
            msgtype: "text".to_string(),
            agentid: agent_id,
            text: TextContent {
                content: content.to_string(),
            },
            safe: 0,
        }
    }
}

/// Response from `POST /cgi-bin/message/send`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMsgResponse {
    #[serde(flatten)]
    pub status: ApiStatus,
    /// Recipients the provider could not deliver to, `|`-separated
    #[serde(default)]
    pub invaliduser: String,
}
