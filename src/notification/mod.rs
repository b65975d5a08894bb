//! Builds and delivers DingTalk robot notifications.
//!
//! The pipeline is split in two leaf steps that know nothing about each
//! other: the [`builder`] renders a [`DingTalkNotification`] from a target's
//! templates and a webhook message, and the [`dispatcher`] signs, posts and
//! decodes a single request. The [`notifier`] composes them for callers.
pub mod builder;
pub mod dispatcher;
pub mod notifier;
pub mod payload;

pub use builder::build_notification;
pub use dispatcher::{dispatch, dispatch_at};
pub use notifier::{DingTalkNotifier, Notifier, NotifyError};
pub use payload::{At, DingTalkNotification, DingTalkResponse, Markdown, MessageType};

use crate::template::TemplateError;
use std::fmt;
use thiserror::Error;

/// Which of a message's two templates was being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePart {
    Title,
    Text,
}

impl fmt::Display for MessagePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessagePart::Title => write!(f, "title"),
            MessagePart::Text => write!(f, "text"),
        }
    }
}

/// A failure while building or dispatching a single notification.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to render {part} template")]
    Render {
        part: MessagePart,
        #[source]
        source: TemplateError,
    },

    #[error("failed to parse target url")]
    Url(#[source] url::ParseError),

    #[error("error encoding DingTalk request")]
    Encode(#[source] serde_json::Error),

    #[error("error sending notification to DingTalk")]
    Transport(#[source] reqwest::Error),

    #[error("unacceptable response code {code}")]
    HttpStatus { code: u16 },

    #[error("error decoding response from DingTalk")]
    Decode(#[source] serde_json::Error),
}

impl NotificationError {
    /// A stable label for the failure stage, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationError::Render { .. } => "render",
            NotificationError::Url(_) => "url",
            NotificationError::Encode(_) => "encode",
            NotificationError::Transport(_) => "transport",
            NotificationError::HttpStatus { .. } => "http_status",
            NotificationError::Decode(_) => "decode",
        }
    }
}
