//! CloudWatch Logs Data Types
//!
//! Events, stream summaries, tail options and the explicit outcomes of a
//! tail or a bounded wait.

#![warn(clippy::all, rust_2018_idioms)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::app::sdk_errors::ErrorCategory;

/// Number of most recent events a tail returns unless told otherwise
pub const DEFAULT_TAIL_LIMIT: i32 = 7;

/// A single log event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Event timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Log message content
    pub message: String,
    /// Time when the event was ingested (Unix milliseconds)
    pub ingestion_time: i64,
    /// Name of the log stream this event belongs to
    pub log_stream_name: String,
}

impl LogEvent {
    pub fn new(timestamp: i64, message: impl Into<String>, log_stream_name: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            ingestion_time: timestamp,
            log_stream_name: log_stream_name.into(),
        }
    }

    pub fn with_ingestion_time(mut self, ingestion_time: i64) -> Self {
        self.ingestion_time = ingestion_time;
        self
    }
}

/// What the poller needs to know about a log stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStreamSummary {
    pub name: String,
    /// Time of the most recent event (Unix milliseconds), absent for streams that never logged
    pub last_event_timestamp: Option<i64>,
    pub first_event_timestamp: Option<i64>,
    pub creation_time: Option<i64>,
}

impl LogStreamSummary {
    pub fn new(name: impl Into<String>, last_event_timestamp: Option<i64>) -> Self {
        Self {
            name: name.into(),
            last_event_timestamp,
            first_event_timestamp: None,
            creation_time: None,
        }
    }
}

/// A log group as listed by `DescribeLogGroups`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupSummary {
    pub name: String,
    pub arn: Option<String>,
    pub retention_in_days: Option<i32>,
    pub stored_bytes: Option<i64>,
    pub creation_time: Option<i64>,
}

/// Options for a tail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailOptions {
    /// Maximum number of events returned from the selected stream
    pub limit: i32,
}

impl TailOptions {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_TAIL_LIMIT,
        }
    }

    /// Set limit; values below 1 fall back to one event
    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = limit.max(1);
        self
    }
}

impl Default for TailOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a tail came back without events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The caller passed an empty or blank group name
    BlankGroupName,
    /// The log group does not exist (yet)
    GroupNotFound,
    /// The group exists but has no streams
    NoStreams,
    /// The most recent stream holds no events
    NoEventsInStream,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EmptyReason::BlankGroupName => "blank log group name",
            EmptyReason::GroupNotFound => "log group not found",
            EmptyReason::NoStreams => "no log streams yet",
            EmptyReason::NoEventsInStream => "latest stream has no events",
        };
        f.write_str(text)
    }
}

/// Result of tailing a log group
///
/// Distinguishes "nothing logged yet" from "the call failed" so callers can
/// decide whether to keep waiting.
#[derive(Debug, Clone, PartialEq)]
pub enum TailOutcome {
    /// Most recent events of the most recently active stream, oldest first
    Events(Vec<LogEvent>),
    Empty(EmptyReason),
    Fault(ErrorCategory),
}

impl TailOutcome {
    pub fn events(&self) -> &[LogEvent] {
        match self {
            TailOutcome::Events(events) => events,
            _ => &[],
        }
    }

    /// Events on success, an empty list for both empty and faulted tails
    pub fn into_events(self) -> Vec<LogEvent> {
        match self {
            TailOutcome::Events(events) => events,
            _ => Vec::new(),
        }
    }

    /// Message of the newest event
    pub fn latest_message(&self) -> Option<&str> {
        self.events().last().map(|event| event.message.as_str())
    }

    /// Timestamp of the newest event, the baseline for "logged after" checks
    pub fn latest_timestamp(&self) -> Option<i64> {
        self.events().last().map(|event| event.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TailOutcome::Empty(_))
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, TailOutcome::Fault(_))
    }

    pub fn fault(&self) -> Option<&ErrorCategory> {
        match self {
            TailOutcome::Fault(category) => Some(category),
            _ => None,
        }
    }
}

/// Bounded retry schedule for waiting on a log expectation
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    /// Sleep after the first unsuccessful poll
    pub initial_delay: Duration,
    /// Upper bound for any single sleep
    pub max_delay: Duration,
    /// Total time budget measured from the first poll
    pub timeout: Duration,
    /// Growth factor between consecutive sleeps
    pub multiplier: f64,
}

impl WaitPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, timeout: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            timeout,
            multiplier: 2.0,
        }
    }

    /// Set multiplier; values below 1.0 (or NaN) mean a constant delay
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        self
    }

    /// Delay to use after `delay`; products too large for a `Duration` cap at `max_delay`
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(1),
            Duration::from_secs(15),
            Duration::from_secs(90),
        )
    }
}

/// Result of a bounded wait
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The expectation held on the `attempts`-th poll
    Satisfied {
        events: Vec<LogEvent>,
        attempts: u32,
        elapsed: Duration,
    },
    /// The time budget ran out; `last` is the final poll's outcome
    TimedOut {
        last: TailOutcome,
        attempts: u32,
        elapsed: Duration,
    },
    /// A fault no amount of waiting will fix
    Aborted { fault: ErrorCategory, attempts: u32 },
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            WaitOutcome::Satisfied { attempts, .. }
            | WaitOutcome::TimedOut { attempts, .. }
            | WaitOutcome::Aborted { attempts, .. } => *attempts,
        }
    }

    /// Events of the satisfying poll, or of the last poll before timing out
    pub fn events(&self) -> &[LogEvent] {
        match self {
            WaitOutcome::Satisfied { events, .. } => events,
            WaitOutcome::TimedOut { last, .. } => last.events(),
            WaitOutcome::Aborted { .. } => &[],
        }
    }
}
