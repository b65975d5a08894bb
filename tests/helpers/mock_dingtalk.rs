//! A mock DingTalk robot endpoint for testing notification delivery.

use dingbridge::config::TargetConfig;
use dingbridge::notification::{dispatch, DingTalkNotification, DingTalkResponse, NotificationError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const ROBOT_PATH: &str = "/robot/send";

pub struct MockRobot {
    pub server: MockServer,
}

impl MockRobot {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// The robot URL with the given query string appended.
    pub fn url(&self, query: &str) -> String {
        format!("{}{}?{}", self.server.uri(), ROBOT_PATH, query)
    }

    /// Answers every POST with HTTP 200 and the given DingTalk result.
    pub async fn respond_with_result(&self, errcode: i64, errmsg: &str) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": errcode,
            "errmsg": errmsg,
        })))
        .await;
    }

    pub async fn respond_with(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(ROBOT_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// Runs the blocking dispatcher off the async runtime with a fresh client.
pub async fn dispatch_blocking(
    target: TargetConfig,
    notification: DingTalkNotification,
) -> Result<DingTalkResponse, NotificationError> {
    tokio::task::spawn_blocking(move || {
        let client = reqwest::blocking::Client::new();
        dispatch(&client, &target, &notification)
    })
    .await
    .unwrap()
}
