//! Renders a DingTalk notification from a target's templates.

use crate::config::{MessageConfig, TargetConfig};
use crate::core::WebhookMessage;
use crate::notification::payload::{At, DingTalkNotification, Markdown, MessageType};
use crate::notification::{MessagePart, NotificationError};
use crate::template::{TemplateContext, TemplateRenderer};
use std::borrow::Cow;

/// Renders the title and text for `target` and attaches its mention
/// directive. Targets without a `message` block use the built-in templates.
pub fn build_notification<R>(
    renderer: &R,
    target: &TargetConfig,
    message: &WebhookMessage,
) -> Result<DingTalkNotification, NotificationError>
where
    R: TemplateRenderer + ?Sized,
{
    let templates = match &target.message {
        Some(templates) => Cow::Borrowed(templates),
        None => Cow::Owned(MessageConfig::default()),
    };
    let context = TemplateContext::new(message);

    let title = renderer
        .render(&templates.title, &context)
        .map_err(|source| NotificationError::Render {
            part: MessagePart::Title,
            source,
        })?;
    let text = renderer
        .render(&templates.text, &context)
        .map_err(|source| NotificationError::Render {
            part: MessagePart::Text,
            source,
        })?;

    let at = target.mention.as_ref().map(|mention| At {
        is_at_all: mention.all,
        at_mobiles: mention.mobiles.clone(),
    });

    Ok(DingTalkNotification {
        message_type: MessageType::Markdown,
        markdown: Markdown { title, text },
        at,
    })
}
