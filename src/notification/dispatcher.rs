//! Delivers a built notification to a robot webhook.
//!
//! One call is one blocking POST: `[sign?] -> encode -> send -> status check
//! -> decode`. Nothing is retried; every failure ends the call.

use crate::config::TargetConfig;
use crate::notification::payload::{DingTalkNotification, DingTalkResponse};
use crate::notification::NotificationError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use sha2::Sha256;
use std::io::{self, Read};
use std::ops::Deref;
use tracing::{debug, warn};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Computes the robot signature for `timestamp`: base64 of
/// HMAC-SHA256(secret, "{timestamp}\n{secret}").
pub fn sign(secret: &str, timestamp: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b"\n");
    mac.update(secret.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Adds `timestamp` and `sign` to `base`, replacing any existing values and
/// keeping every other query parameter in its original order.
pub fn signed_url(base: &str, secret: &str, timestamp_ms: i64) -> Result<Url, NotificationError> {
    let mut url = Url::parse(base).map_err(NotificationError::Url)?;
    let timestamp = timestamp_ms.to_string();
    let signature = sign(secret, &timestamp);

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "timestamp" && key != "sign")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("timestamp", &timestamp)
        .append_pair("sign", &signature);

    Ok(url)
}

/// Sends `notification` to `target`, signing with the current time.
pub fn dispatch(
    client: &Client,
    target: &TargetConfig,
    notification: &DingTalkNotification,
) -> Result<DingTalkResponse, NotificationError> {
    dispatch_at(client, target, notification, Utc::now().timestamp_millis())
}

/// Sends `notification` to `target`, signing with `timestamp_ms` when the
/// target has a secret.
///
/// The returned response may still carry a non-zero `errcode`; checking it
/// is up to the caller.
///
/// A URL that fails to parse is `Url` when signing and `Transport` (a request
/// builder error) when unsigned, since the unsigned URL is passed through as-is.
pub fn dispatch_at(
    client: &Client,
    target: &TargetConfig,
    notification: &DingTalkNotification,
    timestamp_ms: i64,
) -> Result<DingTalkResponse, NotificationError> {
    let request_url = match target.signing_secret() {
        Some(secret) => String::from(signed_url(&target.url, secret, timestamp_ms)?),
        None => target.url.clone(),
    };

    let body = serde_json::to_vec(notification).map_err(NotificationError::Encode)?;

    debug!(
        signed = target.signing_secret().is_some(),
        bytes = body.len(),
        "Posting notification to DingTalk"
    );
    let response = client
        .post(request_url.as_str())
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .map_err(NotificationError::Transport)?;
    let mut response = DrainOnDrop::new(response);

    if response.status() != StatusCode::OK {
        return Err(NotificationError::HttpStatus {
            code: response.status().as_u16(),
        });
    }

    serde_json::from_reader(&mut response).map_err(NotificationError::Decode)
}

/// Owns a response and reads whatever is left of its body when dropped, so
/// the connection goes back to the pool on every exit path.
struct DrainOnDrop {
    response: Response,
}

impl DrainOnDrop {
    fn new(response: Response) -> Self {
        Self { response }
    }
}

impl Deref for DrainOnDrop {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.response
    }
}

impl Read for DrainOnDrop {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.response.read(buf)
    }
}

impl Drop for DrainOnDrop {
    fn drop(&mut self) {
        if let Err(e) = io::copy(&mut self.response, &mut io::sink()) {
            warn!(error = %e, "Failed to drain DingTalk response body");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "SEC000000000000000000000";

    #[test]
    fn test_sign_is_deterministic() {
        let first = sign(SECRET, "1700000000000");
        let second = sign(SECRET, "1700000000000");

        assert_eq!(first, second);
        assert_eq!(first.len(), 44);
        assert!(first.ends_with('='));
        assert_ne!(first, sign(SECRET, "1700000000001"));
    }

    #[test]
    fn test_sign_matches_independent_hmac() {
        let timestamp = "1700000000000";
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}\n{}", timestamp, SECRET).as_bytes());
        let expected = STANDARD.encode(mac.finalize().into_bytes());

        assert_eq!(sign(SECRET, timestamp), expected);

        let mut verifier = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        verifier.update(format!("{}\n{}", timestamp, SECRET).as_bytes());
        let decoded = STANDARD.decode(sign(SECRET, timestamp)).unwrap();
        assert!(verifier.verify_slice(&decoded).is_ok());
    }

    #[test]
    fn test_signed_url_preserves_existing_parameters() {
        let url = signed_url(
            "https://oapi.dingtalk.com/robot/send?access_token=abc123&lang=zh",
            SECRET,
            1_700_000_000_000,
        )
        .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.path(), "/robot/send");
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], ("access_token".to_string(), "abc123".to_string()));
        assert_eq!(pairs[1], ("lang".to_string(), "zh".to_string()));
        assert_eq!(pairs[2], ("timestamp".to_string(), "1700000000000".to_string()));
        assert_eq!(
            pairs[3],
            ("sign".to_string(), sign(SECRET, "1700000000000"))
        );
    }

    #[test]
    fn test_signed_url_overwrites_stale_signature() {
        let url = signed_url(
            "https://oapi.dingtalk.com/robot/send?timestamp=1&access_token=abc&sign=stale",
            SECRET,
            42,
        )
        .unwrap();

        let timestamps: Vec<_> = url.query_pairs().filter(|(k, _)| k == "timestamp").collect();
        let signs: Vec<_> = url.query_pairs().filter(|(k, _)| k == "sign").collect();

        assert_eq!(timestamps.len(), 1);
        assert_eq!(timestamps[0].1, "42");
        assert_eq!(signs.len(), 1);
        assert_eq!(signs[0].1, sign(SECRET, "42"));
    }

    #[test]
    fn test_signed_url_rejects_unparseable_url() {
        let result = signed_url("not a url", SECRET, 42);

        assert!(matches!(result, Err(NotificationError::Url(_))));
    }

    #[test]
    fn test_signature_is_percent_encoded_in_query() {
        // Pick a timestamp whose signature contains a reserved character.
        let timestamp = (0..1000)
            .find(|ts| {
                let s = sign(SECRET, &ts.to_string());
                s.contains('+') || s.contains('/')
            })
            .unwrap();

        let url = signed_url("https://oapi.dingtalk.com/robot/send", SECRET, timestamp);
        let query = url.unwrap().query().unwrap().to_string();

        let raw_sign = query.split("sign=").nth(1).unwrap();
        assert!(!raw_sign.contains('+'));
        assert!(!raw_sign.contains('/'));
        assert!(raw_sign.ends_with("%3D"));
    }
}
