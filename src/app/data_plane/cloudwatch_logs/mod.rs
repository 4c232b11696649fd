//! CloudWatch Logs Integration Module
//!
//! Tails log groups to confirm that actions against a deployment were
//! recorded.
//!
//! ## Features
//!
//! - Most recent events of the most recently active stream ([`LogTailPoller::tail`])
//! - Bounded waiting with capped exponential backoff ([`LogTailPoller::wait_for`])
//! - Explicit outcomes: events, empty-with-reason, or a categorized fault
//! - Log group and stream listing for deployment checks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use infraprobe::app::aws_session::AwsSession;
//! use infraprobe::app::data_plane::cloudwatch_logs::{
//!     CloudWatchLogsClient, LogExpectation, LogTailPoller, WaitPolicy,
//! };
//!
//! # async fn example() {
//! let client = CloudWatchLogsClient::new(AwsSession::new("eu-central-1"));
//! let poller = LogTailPoller::new(client);
//!
//! let outcome = poller
//!     .wait_for(
//!         "/var/log/cloudxserverless-app",
//!         &LogExpectation::latest_contains("POST /api/image"),
//!         &WaitPolicy::default(),
//!     )
//!     .await;
//! assert!(outcome.is_satisfied());
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod client;
pub mod delay;
pub mod expectation;
pub mod poller;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use client::CloudWatchLogsClient;
pub use delay::{delay, delay_secs};
pub use expectation::LogExpectation;
pub use poller::{select_latest_stream, LogTailPoller};
pub use source::{LogSource, MemoryLogSource};
pub use types::{
    EmptyReason, LogEvent, LogGroupSummary, LogStreamSummary, TailOptions, TailOutcome,
    WaitOutcome, WaitPolicy, DEFAULT_TAIL_LIMIT,
};
