//! CloudTrail Trail Inspection Module
//!
//! Reads the configuration and state of the audit trail a deployment
//! creates: whether it is multi-region, validates log files, is encrypted,
//! is currently logging, and carries the expected tags.

#![warn(clippy::all, rust_2018_idioms)]

pub mod client;
pub mod types;

pub use client::CloudTrailClient;
pub use types::{has_tag, ResourceTag, TrailStatus, TrailSummary};
