//! A client for sending webhook messages to configured DingTalk robots.

use crate::config::{Config, TargetConfig};
use crate::core::WebhookMessage;
use crate::notification::builder::build_notification;
use crate::notification::dispatcher::dispatch;
use crate::notification::payload::{DingTalkNotification, DingTalkResponse};
use crate::notification::NotificationError;
use crate::template::{TemplateEngine, TemplateError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use reqwest::blocking::Client;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task;
use tracing::{error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("DingTalk rejected the notification: errcode {code}, errmsg {message}")]
    Rejected { code: i64, message: String },

    #[error("notification task failed")]
    Task(#[from] task::JoinError),
}

/// A trait for clients that can deliver a webhook message to a named target.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Renders `message` for `target` and delivers it.
    async fn notify(&self, target: &str, message: &WebhookMessage) -> Result<DingTalkResponse, NotifyError>;
}

/// Delivers messages to the robots of a loaded configuration.
///
/// Cloning is cheap; clones share the templates, the targets and one HTTP
/// client, so connections to a robot are reused across notifications.
#[derive(Clone)]
pub struct DingTalkNotifier {
    templates: Arc<TemplateEngine>,
    targets: Arc<BTreeMap<String, Arc<TargetConfig>>>,
    timeout: Duration,
    client: Arc<OnceLock<Client>>,
}

impl DingTalkNotifier {
    /// Creates a new `DingTalkNotifier`.
    pub fn new(templates: TemplateEngine, targets: BTreeMap<String, TargetConfig>, timeout: Duration) -> Self {
        let targets = targets
            .into_iter()
            .map(|(name, target)| (name, Arc::new(target)))
            .collect();
        Self {
            templates: Arc::new(templates),
            targets: Arc::new(targets),
            timeout,
            client: Arc::new(OnceLock::new()),
        }
    }

    /// Loads the configured template files and targets.
    pub fn from_config(config: &Config) -> Result<Self, TemplateError> {
        let templates = TemplateEngine::with_files(&config.templates)?;
        Ok(Self::new(templates, config.targets.clone(), config.http.timeout()))
    }

    /// Names of the configured targets, in order.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn target(&self, name: &str) -> Result<Arc<TargetConfig>, NotifyError> {
        self.targets
            .get(name)
            .cloned()
            .ok_or_else(|| NotifyError::UnknownTarget(name.to_string()))
    }

    /// Builds the notification `notify` would send, without sending it.
    pub fn render(&self, target: &str, message: &WebhookMessage) -> Result<DingTalkNotification, NotifyError> {
        let config = self.target(target)?;
        Ok(build_notification(self.templates.as_ref(), &config, message)?)
    }

    /// Sends the request in a blocking manner.
    ///
    /// The blocking client starts its own runtime, so it is built on first
    /// use inside the blocking task rather than in `new`.
    fn send_request(
        client: &OnceLock<Client>,
        target: &TargetConfig,
        notification: &DingTalkNotification,
        timeout: Duration,
    ) -> Result<DingTalkResponse, NotificationError> {
        let client = match client.get() {
            Some(client) => client,
            None => {
                let built = Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(NotificationError::Transport)?;
                client.get_or_init(|| built)
            }
        };
        dispatch(client, target, notification)
    }
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    /// Renders and sends a message to the named robot.
    #[instrument(skip(self, target, message), fields(target_name = %target, alerts = message.alerts.len()))]
    async fn notify(&self, target: &str, message: &WebhookMessage) -> Result<DingTalkResponse, NotifyError> {
        let config = self.target(target)?;
        let notification = build_notification(self.templates.as_ref(), &config, message).map_err(|e| {
            error!(error = %e, kind = e.kind(), "Failed to build DingTalk notification");
            e
        })?;

        let client = self.client.clone();
        let timeout = self.timeout;
        let result =
            task::spawn_blocking(move || Self::send_request(&client, &config, &notification, timeout)).await;

        match result {
            Ok(Ok(response)) if response.is_success() => {
                info!("Successfully sent notification to DingTalk.");
                Ok(response)
            }
            Ok(Ok(response)) => {
                warn!(
                    errcode = response.errcode,
                    errmsg = %response.errmsg,
                    "DingTalk rejected the notification"
                );
                Err(NotifyError::Rejected {
                    code: response.errcode,
                    message: response.errmsg,
                })
            }
            Ok(Err(e)) => {
                error!(error = %e, kind = e.kind(), "Failed to send DingTalk notification");
                Err(e.into())
            }
            Err(e) => {
                error!(error = %e, "DingTalk notification task failed");
                Err(e.into())
            }
        }
    }
}
