/// dingbridge - forwards Alertmanager notifications to DingTalk robots
///
/// This library renders webhook messages through per-target Handlebars
/// templates, signs requests with each robot's secret, and delivers them.
pub mod cli;
pub mod config;
pub mod core;
pub mod notification;
pub mod template;

// Re-export core types for convenience
pub use core::*;
