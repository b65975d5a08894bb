//! Wire types exchanged with the DingTalk robot API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of message sent to the robot. Only markdown is produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Markdown,
}

/// A message ready to be posted to a robot webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DingTalkNotification {
    #[serde(rename = "msgtype")]
    pub message_type: MessageType,
    pub markdown: Markdown,
    /// Absent, not empty, when the target has no mention directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<At>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Markdown {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct At {
    pub is_at_all: bool,
    pub at_mobiles: Vec<String>,
}

/// The robot's reply. HTTP 200 only means the request was received;
/// `errcode` must be zero for the message to have been delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DingTalkResponse {
    pub errcode: i64,
    pub errmsg: String,
    /// Any other fields the robot returned, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DingTalkResponse {
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }
}
