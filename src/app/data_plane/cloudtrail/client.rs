//! AWS SDK client wrapper for CloudTrail trails

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Context, Result};
use aws_sdk_cloudtrail as cloudtrail_sdk;
use cloudtrail_sdk::error::DisplayErrorContext;
use regex::Regex;

use crate::app::aws_session::AwsSession;

use super::types::{ResourceTag, TrailStatus, TrailSummary};

/// Client for reading CloudTrail trail configuration
#[derive(Clone)]
pub struct CloudTrailClient {
    session: AwsSession,
}

impl CloudTrailClient {
    pub fn new(session: AwsSession) -> Self {
        Self { session }
    }

    async fn sdk_client(&self) -> cloudtrail_sdk::Client {
        cloudtrail_sdk::Client::new(&self.session.config().await)
    }

    /// All trails visible from the session's region (shadow trails included)
    pub async fn describe_trails(&self) -> Result<Vec<TrailSummary>> {
        let client = self.sdk_client().await;
        let response = client
            .describe_trails()
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
            .context("Failed to describe CloudTrail trails")?;

        Ok(response
            .trail_list
            .unwrap_or_default()
            .into_iter()
            .map(TrailSummary::from)
            .collect())
    }

    /// First trail, erroring when the account has none
    pub async fn first_trail(&self) -> Result<TrailSummary> {
        self.describe_trails()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No CloudTrail trails found"))
    }

    /// First trail whose name matches `pattern`
    pub async fn find_trail(&self, pattern: &Regex) -> Result<Option<TrailSummary>> {
        let trails = self.describe_trails().await?;
        Ok(find_matching(trails, pattern))
    }

    /// Full configuration of one trail
    pub async fn get_trail(&self, name: &str) -> Result<TrailSummary> {
        let client = self.sdk_client().await;
        let response = client
            .get_trail()
            .name(name)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
            .with_context(|| format!("Failed to get trail {}", name))?;

        response
            .trail
            .map(TrailSummary::from)
            .ok_or_else(|| anyhow!("Trail {} not found", name))
    }

    /// Logging state of one trail
    pub async fn logging_status(&self, name: &str) -> Result<TrailStatus> {
        let client = self.sdk_client().await;
        let response = client
            .get_trail_status()
            .name(name)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
            .with_context(|| format!("Failed to get status of trail {}", name))?;

        Ok(TrailStatus {
            is_logging: response.is_logging.unwrap_or(false),
            latest_delivery_time: response
                .latest_delivery_time
                .and_then(|dt| dt.to_millis().ok()),
            latest_delivery_error: response.latest_delivery_error,
            start_logging_time: response
                .start_logging_time
                .and_then(|dt| dt.to_millis().ok()),
        })
    }

    /// Tags of the trail identified by `trail_arn`
    pub async fn trail_tags(&self, trail_arn: &str) -> Result<Vec<ResourceTag>> {
        let client = self.sdk_client().await;
        let response = client
            .list_tags()
            .resource_id_list(trail_arn)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
            .with_context(|| format!("Failed to list tags of trail {}", trail_arn))?;

        Ok(response
            .resource_tag_list
            .unwrap_or_default()
            .into_iter()
            .flat_map(|resource| resource.tags_list.unwrap_or_default())
            .map(|tag| ResourceTag {
                key: tag.key().to_string(),
                value: tag.value().map(str::to_string),
            })
            .collect())
    }
}

fn find_matching(trails: Vec<TrailSummary>, pattern: &Regex) -> Option<TrailSummary> {
    trails.into_iter().find(|trail| pattern.is_match(&trail.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_matching_uses_name_pattern() {
        let trails = vec![
            TrailSummary {
                name: "organization-trail".to_string(),
                ..Default::default()
            },
            TrailSummary {
                name: "cloudxserverless-Trail5C1A2B-xyz".to_string(),
                is_multi_region: true,
                ..Default::default()
            },
        ];
        let pattern = Regex::new(r"^cloudxserverless-Trail[\w-]+$").unwrap();

        let found = find_matching(trails, &pattern).unwrap();
        assert_eq!(found.name, "cloudxserverless-Trail5C1A2B-xyz");
        assert!(found.is_multi_region);
    }

    #[test]
    fn test_find_matching_none() {
        let pattern = Regex::new(r"^cloudxserverless-Trail[\w-]+$").unwrap();
        assert!(find_matching(Vec::new(), &pattern).is_none());
    }
}
