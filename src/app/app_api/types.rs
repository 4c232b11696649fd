//! Application API types

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use reqwest::Method;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::app::data_plane::cloudwatch_logs::LogExpectation;

/// One call against the application API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    UploadImage,
    ListImages,
    GetImage(String),
    DownloadImage(String),
    DeleteImage(String),
    Subscribe(String),
    ListSubscriptions,
    Unsubscribe(String),
}

impl AppAction {
    pub fn method(&self) -> Method {
        match self {
            AppAction::UploadImage | AppAction::Subscribe(_) => Method::POST,
            AppAction::DeleteImage(_) | AppAction::Unsubscribe(_) => Method::DELETE,
            AppAction::ListImages
            | AppAction::GetImage(_)
            | AppAction::DownloadImage(_)
            | AppAction::ListSubscriptions => Method::GET,
        }
    }

    /// Path segments below the base URL
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            AppAction::UploadImage | AppAction::ListImages => vec!["api", "image"],
            AppAction::GetImage(id) | AppAction::DeleteImage(id) => vec!["api", "image", id.as_str()],
            AppAction::DownloadImage(id) => vec!["api", "image", "file", id.as_str()],
            AppAction::Subscribe(email) | AppAction::Unsubscribe(email) => {
                vec!["api", "notification", email.as_str()]
            }
            AppAction::ListSubscriptions => vec!["api", "notification"],
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.path_segments().join("/"))
    }

    /// What the access log must show once this call was recorded
    ///
    /// The newest line has to carry the call's fragment; with a `baseline`
    /// (newest timestamp before the call) it must also be newer than that.
    pub fn log_expectation(&self, baseline: Option<i64>) -> LogExpectation {
        match baseline {
            Some(after) => LogExpectation::latest_contains_after(self.log_fragment(), after),
            None => LogExpectation::latest_contains(self.log_fragment()),
        }
    }

    /// Fragment the application's access log line for this call contains
    ///
    /// Listing images is matched together with the protocol so it cannot be
    /// confused with a request for a single image.
    pub fn log_fragment(&self) -> String {
        match self {
            AppAction::ListImages => format!("{} {} HTTP/1.1", self.method(), self.path()),
            _ => format!("{} {}", self.method(), self.path()),
        }
    }
}

/// Status and raw body of an API call
///
/// Non-2xx statuses are data here, not errors: verification runs assert on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .with_context(|| format!("Unexpected response body (status {})", self.status))
    }
}

/// An image known to the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub object_key: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub object_size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub download_link: Option<String>,
}

/// A notification subscription as reported by the application (SNS shape)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subscription {
    #[serde(default)]
    pub subscription_arn: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub topic_arn: Option<String>,
}

impl Subscription {
    /// SNS reports unconfirmed email subscriptions with this placeholder ARN
    pub fn is_pending_confirmation(&self) -> bool {
        self.subscription_arn.as_deref() == Some("PendingConfirmation")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
