//! Message templating.
//!
//! Titles and texts are Handlebars templates rendered against a
//! [`TemplateContext`]: the webhook message fields (camelCase, as Alertmanager
//! sends them) plus `firing`, `resolved`, `firingCount` and `resolvedCount`.
//!
//! The registry runs in strict mode, so a template that references a field
//! the payload does not carry fails to render instead of printing nothing.
//! HTML escaping is off because the output is markdown.

use crate::core::{Alert, WebhookMessage};
use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default title: `[FIRING:2] HighLatency`.
pub const DEFAULT_TITLE_TEMPLATE: &str =
    "[{{upper status}}{{#if firingCount}}:{{firingCount}}{{/if}}] {{join_values groupLabels}}";

/// Default text: a header linking back to Alertmanager, then one section per
/// alert state.
pub const DEFAULT_TEXT_TEMPLATE: &str = r#"#### \[{{upper status}}{{#if firingCount}}:{{firingCount}}{{/if}}\] **[{{join_values groupLabels}}]({{externalURL}}/#/alerts?receiver={{receiver}})**
{{#if firingCount}}
**Alerts Firing**
{{#each firing}}{{> dingtalk_alert}}{{/each}}
{{/if}}
{{#if resolvedCount}}
**Alerts Resolved**
{{#each resolved}}{{> dingtalk_alert}}{{/each}}
{{/if}}"#;

/// Built-in partial describing a single alert.
const ALERT_PARTIAL_NAME: &str = "dingtalk_alert";
const ALERT_PARTIAL: &str = r#"
**Labels**
{{#each labels}}> - {{@key}}: {{this}}
{{/each}}
**Annotations**
{{#each annotations}}> - {{@key}}: {{this}}
{{/each}}
**Source:** [{{generatorURL}}]({{generatorURL}})
"#;

handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(join_values: |map: object| map
    .values()
    .filter_map(|value| value.as_str())
    .collect::<Vec<_>>()
    .join(" "));

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to register template '{name}'")]
    Register {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("template path {0} has no file name")]
    InvalidPath(PathBuf),

    #[error(transparent)]
    Render(#[from] handlebars::RenderError),
}

/// The data a title or text template is rendered against.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContext<'a> {
    #[serde(flatten)]
    pub message: &'a WebhookMessage,
    pub firing: Vec<&'a Alert>,
    pub resolved: Vec<&'a Alert>,
    pub firing_count: usize,
    pub resolved_count: usize,
}

impl<'a> TemplateContext<'a> {
    pub fn new(message: &'a WebhookMessage) -> Self {
        let firing: Vec<_> = message.firing().collect();
        let resolved: Vec<_> = message.resolved().collect();
        Self {
            message,
            firing_count: firing.len(),
            resolved_count: resolved.len(),
            firing,
            resolved,
        }
    }
}

/// Something that can turn a template string into text.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &TemplateContext<'_>) -> Result<String, TemplateError>;
}

/// A Handlebars registry holding the built-in helpers and partials plus any
/// user-supplied template files.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl TemplateEngine {
    /// Creates an engine with only the built-in helpers and partials.
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(no_escape);
        registry.register_helper("upper", Box::new(upper));
        registry.register_helper("join_values", Box::new(join_values));
        registry
            .register_partial(ALERT_PARTIAL_NAME, ALERT_PARTIAL)
            .map_err(|source| TemplateError::Register {
                name: ALERT_PARTIAL_NAME.to_string(),
                source: Box::new(source),
            })?;
        Ok(Self { registry })
    }

    /// Creates an engine and registers each file as a partial named after
    /// its file stem, so `templates/footer.hbs` is used as `{{> footer}}`.
    pub fn with_files(paths: &[PathBuf]) -> Result<Self, TemplateError> {
        let mut engine = Self::new()?;
        for path in paths {
            engine.register_file(path)?;
        }
        Ok(engine)
    }

    pub fn register_file(&mut self, path: &Path) -> Result<(), TemplateError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| TemplateError::InvalidPath(path.to_path_buf()))?
            .to_string();

        self.registry
            .register_template_file(&name, path)
            .map_err(|source| TemplateError::Register {
                name: name.clone(),
                source: Box::new(source),
            })?;
        debug!(name = %name, path = %path.display(), "Registered template file");
        Ok(())
    }
}

impl TemplateRenderer for TemplateEngine {
    fn render(&self, template: &str, context: &TemplateContext<'_>) -> Result<String, TemplateError> {
        Ok(self.registry.render_template(template, context)?)
    }
}
