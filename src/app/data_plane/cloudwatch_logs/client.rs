//! CloudWatch Logs Client Wrapper
//!
//! SDK-backed [`LogSource`] plus the listing helpers used when checking that
//! a deployment ships its logs where it should.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use cloudwatchlogs::error::DisplayErrorContext;
use cloudwatchlogs::types::OrderBy;

use crate::app::aws_session::AwsSession;

use super::source::LogSource;
use super::types::{LogEvent, LogGroupSummary, LogStreamSummary};

/// `DescribeLogStreams` page size; the service maximum
const STREAM_PAGE_SIZE: i32 = 50;

/// CloudWatch Logs client wrapper
#[derive(Clone)]
pub struct CloudWatchLogsClient {
    session: AwsSession,
    region: String,
}

impl CloudWatchLogsClient {
    /// Create a client for the session's default region
    pub fn new(session: AwsSession) -> Self {
        let region = session.default_region().to_string();
        Self { session, region }
    }

    /// Same session, different region (e.g. `us-east-1` for cloud-init logs)
    pub fn for_region(&self, region: &str) -> Self {
        Self {
            session: self.session.clone(),
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn sdk_client(&self) -> cloudwatchlogs::Client {
        let aws_config = self.session.config_for_region(&self.region).await;
        cloudwatchlogs::Client::new(&aws_config)
    }

    /// List log groups, optionally restricted to a name prefix
    pub async fn list_log_groups(&self, prefix: Option<&str>) -> Result<Vec<LogGroupSummary>> {
        let client = self.sdk_client().await;

        let mut request = client.describe_log_groups();
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            request = request.log_group_name_prefix(prefix);
        }

        let mut paginator = request.into_paginator().send();
        let mut log_groups = Vec::new();

        while let Some(page) = paginator.next().await {
            let page = page
                .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
                .with_context(|| format!("Failed to list log groups in {}", self.region))?;

            for group in page.log_groups.unwrap_or_default() {
                if let Some(name) = group.log_group_name {
                    log_groups.push(LogGroupSummary {
                        name,
                        arn: group.arn,
                        retention_in_days: group.retention_in_days,
                        stored_bytes: group.stored_bytes,
                        creation_time: group.creation_time,
                    });
                }
            }
        }

        log_debug!(
            "Found {} log groups in {} (prefix: {:?})",
            log_groups.len(),
            self.region,
            prefix
        );
        Ok(log_groups)
    }

    /// Names of every stream in a log group, following `nextToken` to the end
    pub async fn list_log_stream_names(&self, log_group_name: &str) -> Result<Vec<String>> {
        let client = self.sdk_client().await;

        let mut paginator = client
            .describe_log_streams()
            .log_group_name(log_group_name)
            .into_paginator()
            .send();

        let mut names = Vec::new();
        while let Some(page) = paginator.next().await {
            let page = page
                .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
                .with_context(|| {
                    format!("Failed to list log streams for log group: {}", log_group_name)
                })?;

            names.extend(
                page.log_streams
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|stream| stream.log_stream_name),
            );
        }

        Ok(names)
    }

    /// One page of events from a named stream, as the service returns it
    pub async fn stream_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
    ) -> Result<Vec<LogEvent>> {
        let client = self.sdk_client().await;

        let response = client
            .get_log_events()
            .log_group_name(log_group_name)
            .log_stream_name(log_stream_name)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
            .with_context(|| {
                format!(
                    "Failed to get log events from {} / {}",
                    log_group_name, log_stream_name
                )
            })?;

        Ok(convert_events(response.events.unwrap_or_default(), log_stream_name))
    }
}

#[async_trait]
impl LogSource for CloudWatchLogsClient {
    async fn streams_by_last_event(
        &self,
        log_group_name: &str,
    ) -> Result<Option<Vec<LogStreamSummary>>> {
        let client = self.sdk_client().await;

        let response = client
            .describe_log_streams()
            .log_group_name(log_group_name)
            .order_by(OrderBy::LastEventTime)
            .descending(true)
            .limit(STREAM_PAGE_SIZE)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                log_debug!("Log group {} does not exist", log_group_name);
                return Ok(None);
            }
            Err(err) => {
                return Err(anyhow!("{}", DisplayErrorContext(err))).with_context(|| {
                    format!("Failed to describe log streams for {}", log_group_name)
                });
            }
        };

        let streams = response
            .log_streams
            .unwrap_or_default()
            .into_iter()
            .filter_map(|stream| {
                let name = stream.log_stream_name?;
                Some(LogStreamSummary {
                    name,
                    last_event_timestamp: stream.last_event_timestamp,
                    first_event_timestamp: stream.first_event_timestamp,
                    creation_time: stream.creation_time,
                })
            })
            .collect();

        Ok(Some(streams))
    }

    async fn recent_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        limit: i32,
    ) -> Result<Vec<LogEvent>> {
        let client = self.sdk_client().await;

        // Without a token and with start_from_head=false the service returns
        // the newest page, still ordered oldest first.
        let response = match client
            .get_log_events()
            .log_group_name(log_group_name)
            .log_stream_name(log_stream_name)
            .limit(limit)
            .start_from_head(false)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                log_debug!(
                    "Log stream {} disappeared from {}",
                    log_stream_name,
                    log_group_name
                );
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(anyhow!("{}", DisplayErrorContext(err))).with_context(|| {
                    format!(
                        "Failed to get recent log events from {} / {}",
                        log_group_name, log_stream_name
                    )
                });
            }
        };

        Ok(convert_events(response.events.unwrap_or_default(), log_stream_name))
    }
}

fn convert_events(events: Vec<cloudwatchlogs::types::OutputLogEvent>, log_stream_name: &str) -> Vec<LogEvent> {
    events
        .into_iter()
        .map(|event| {
            let timestamp = event.timestamp.unwrap_or(0);
            LogEvent::new(
                timestamp,
                event.message.unwrap_or_default(),
                log_stream_name,
            )
            .with_ingestion_time(event.ingestion_time.unwrap_or(timestamp))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_region_keeps_session() {
        let client = CloudWatchLogsClient::new(AwsSession::new("eu-central-1"));
        assert_eq!(client.region(), "eu-central-1");

        let us = client.for_region("us-east-1");
        assert_eq!(us.region(), "us-east-1");
        assert_eq!(client.region(), "eu-central-1");
    }

    #[test]
    fn test_convert_events_fills_missing_fields() {
        let events = vec![
            cloudwatchlogs::types::OutputLogEvent::builder()
                .timestamp(1_000)
                .message("POST /api/image HTTP/1.1")
                .build(),
            cloudwatchlogs::types::OutputLogEvent::builder()
                .timestamp(2_000)
                .ingestion_time(2_500)
                .build(),
        ];

        let converted = convert_events(events, "i-0abc");
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].ingestion_time, 1_000);
        assert_eq!(converted[0].log_stream_name, "i-0abc");
        assert_eq!(converted[1].message, "");
        assert_eq!(converted[1].ingestion_time, 2_500);
    }
}
