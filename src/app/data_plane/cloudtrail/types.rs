//! CloudTrail data types

#![warn(clippy::all, rust_2018_idioms)]

use aws_sdk_cloudtrail as cloudtrail_sdk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trail configuration as returned by `DescribeTrails` / `GetTrail`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailSummary {
    pub name: String,
    pub arn: Option<String>,
    pub home_region: Option<String>,
    pub is_multi_region: bool,
    pub log_file_validation_enabled: bool,
    /// Present when the trail is encrypted with SSE-KMS
    pub kms_key_id: Option<String>,
    pub s3_bucket_name: Option<String>,
    pub cloud_watch_logs_log_group_arn: Option<String>,
}

impl TrailSummary {
    pub fn is_kms_encrypted(&self) -> bool {
        self.kms_key_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

impl From<cloudtrail_sdk::types::Trail> for TrailSummary {
    fn from(trail: cloudtrail_sdk::types::Trail) -> Self {
        Self {
            name: trail.name.unwrap_or_default(),
            arn: trail.trail_arn,
            home_region: trail.home_region,
            is_multi_region: trail.is_multi_region_trail.unwrap_or(false),
            log_file_validation_enabled: trail.log_file_validation_enabled.unwrap_or(false),
            kms_key_id: trail.kms_key_id,
            s3_bucket_name: trail.s3_bucket_name,
            cloud_watch_logs_log_group_arn: trail.cloud_watch_logs_log_group_arn,
        }
    }
}

/// Result of `GetTrailStatus`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailStatus {
    pub is_logging: bool,
    /// Unix milliseconds
    pub latest_delivery_time: Option<i64>,
    pub latest_delivery_error: Option<String>,
    /// Unix milliseconds
    pub start_logging_time: Option<i64>,
}

impl TrailStatus {
    pub fn latest_delivery(&self) -> Option<DateTime<Utc>> {
        self.latest_delivery_time
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// A tag attached to a trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTag {
    pub key: String,
    pub value: Option<String>,
}

impl ResourceTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// True when `tags` holds `key` with exactly `value`
pub fn has_tag(tags: &[ResourceTag], key: &str, value: &str) -> bool {
    tags.iter()
        .any(|tag| tag.key == key && tag.value.as_deref() == Some(value))
}
