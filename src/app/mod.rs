//! Core modules for infraprobe.
//!
//! # Module Organization
//!
//! - [`aws_session`] - Region-scoped AWS SDK configuration
//! - [`sdk_errors`] - Categorization of AWS SDK failures into retryable and fatal
//! - [`config`] - Probe settings and deployment outputs
//! - [`data_plane`] - CloudWatch Logs tailing and CloudTrail inspection
//! - [`app_api`] - REST client for the deployed application

pub mod app_api;
pub mod aws_session;
pub mod config;
pub mod data_plane;
pub mod sdk_errors;
