//! infraprobe - Deployed Infrastructure Verification Helpers
//!
//! infraprobe checks that a deployed AWS application behaves the way its
//! infrastructure definition says it should. The heart of the crate is the
//! log-tail poller: after an action is triggered against the running
//! application (an image upload, a notification subscription) the poller
//! finds the most recently active CloudWatch log stream and confirms the
//! action was recorded, tolerating the ingestion delay of the logging
//! pipeline.
//!
//! # Major Subsystems
//!
//! ## Log Tailing
//!
//! [`app::data_plane::cloudwatch_logs`] holds the [`LogTailPoller`], the
//! [`LogSource`] seam it reads through and the SDK-backed
//! [`CloudWatchLogsClient`]. Results are explicit: a tail either yields
//! events, is empty for a known reason, or carries a categorized fault.
//!
//! ## Audit Trail
//!
//! [`app::data_plane::cloudtrail`] reads trail configuration, logging status
//! and tags.
//!
//! ## Application API
//!
//! [`app::app_api`] drives the deployed application's REST endpoints so that
//! a verification run can trigger the actions it then looks for in the logs.
//!
//! ## Configuration
//!
//! [`app::config`] loads probe settings and deployment outputs into explicit
//! values that are passed to whatever needs them.

#![warn(clippy::all, rust_2018_idioms)]

// Include logging macros first
#[macro_use]
pub mod logging_macros;

pub mod app;

pub use app::data_plane::cloudwatch_logs::{
    CloudWatchLogsClient, LogExpectation, LogSource, LogTailPoller, TailOutcome, WaitOutcome,
    WaitPolicy,
};
