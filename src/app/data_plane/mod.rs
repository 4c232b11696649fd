//! Data Plane Services Module
//!
//! Read-mostly access to the AWS services a deployment reports into.
//!
//! ## Available Services
//!
//! - **CloudWatch Logs**: tail log groups and wait for expected entries
//! - **CloudTrail**: trail configuration, logging status and tags

pub mod cloudtrail;
pub mod cloudwatch_logs;

// Re-export commonly used types from each service
pub use cloudwatch_logs::{
    CloudWatchLogsClient, LogTailPoller, TailOutcome as CloudWatchLogsTailOutcome,
};

pub use cloudtrail::{CloudTrailClient, TrailStatus, TrailSummary};
