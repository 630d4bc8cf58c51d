//! Transport boundary: one function per backend endpoint.
//!
//! Everything in here turns HTTP statuses and `{status, ...}` envelopes into
//! [`VoteError`] kinds so the components never look at raw status codes.

use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::VoteError;

pub mod admin;
pub mod auth;
pub mod participants;
pub mod results;
pub mod session;
pub mod users;
pub mod votes;

/// HTTP client bound to the backend's versioned base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, VoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoteError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// A response that arrived, split into success payload and failure.
#[derive(Debug)]
pub enum Reply<T> {
    Success(T),
    Failure { status: StatusCode, message: String },
}

/// Reads a JSON body, honoring the `status` envelope field.
///
/// A 2xx response whose envelope says anything but `"success"` is a failure.
pub async fn read_reply<T: DeserializeOwned>(response: Response) -> Result<Reply<T>, VoteError> {
    let status = response.status();
    let body = response.text().await?;
    debug!("<- {} ({} bytes)", status, body.len());

    let value = if body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => value,
            Err(e) if status.is_success() => return Err(VoteError::Decode(e.to_string())),
            Err(_) => Value::Null,
        }
    };

    if !status.is_success() {
        return Ok(Reply::Failure {
            status,
            message: message_of(&value, status),
        });
    }

    if let Some(envelope) = value.get("status").and_then(Value::as_str) {
        if envelope != "success" {
            return Ok(Reply::Failure {
                status,
                message: message_of(&value, status),
            });
        }
    }

    serde_json::from_value(value)
        .map(Reply::Success)
        .map_err(|e| VoteError::Decode(e.to_string()))
}

fn message_of(value: &Value, status: StatusCode) -> String {
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

/// Fallback mapping for failures an endpoint has no specific meaning for.
pub fn unexpected(status: StatusCode, message: String) -> VoteError {
    if status == StatusCode::FORBIDDEN {
        VoteError::Forbidden(message)
    } else {
        VoteError::Server {
            status: status.as_u16(),
            message,
        }
    }
}
