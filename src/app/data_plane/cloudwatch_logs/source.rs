//! The read-only view of CloudWatch Logs the poller works against.
//!
//! [`CloudWatchLogsClient`](super::CloudWatchLogsClient) implements it over the
//! AWS SDK; [`MemoryLogSource`] implements it in memory so verification
//! flows can be exercised without an AWS account.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::types::{LogEvent, LogStreamSummary};

/// Source of log streams and events
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Streams of `log_group_name`, most recently active first
    ///
    /// Returns `Ok(None)` when the group does not exist.
    async fn streams_by_last_event(
        &self,
        log_group_name: &str,
    ) -> Result<Option<Vec<LogStreamSummary>>>;

    /// Most recent `limit` events of one stream, oldest first
    ///
    /// A stream that vanished between listing and reading yields no events.
    async fn recent_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        limit: i32,
    ) -> Result<Vec<LogEvent>>;

    /// Service label used when categorizing failures
    fn service_name(&self) -> &str {
        "CloudWatchLogs"
    }
}

#[async_trait]
impl<T: LogSource + ?Sized> LogSource for Arc<T> {
    async fn streams_by_last_event(
        &self,
        log_group_name: &str,
    ) -> Result<Option<Vec<LogStreamSummary>>> {
        (**self).streams_by_last_event(log_group_name).await
    }

    async fn recent_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        limit: i32,
    ) -> Result<Vec<LogEvent>> {
        (**self)
            .recent_events(log_group_name, log_stream_name, limit)
            .await
    }

    fn service_name(&self) -> &str {
        (**self).service_name()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    groups: BTreeMap<String, Vec<MemoryStream>>,
    /// Errors returned by the next calls, in order
    pending_failures: VecDeque<String>,
    stream_listings: u32,
    event_fetches: u32,
}

#[derive(Debug)]
struct MemoryStream {
    summary: LogStreamSummary,
    events: Vec<LogEvent>,
}

/// In-memory [`LogSource`] with fault injection
#[derive(Debug, Default)]
pub struct MemoryLogSource {
    state: Mutex<MemoryState>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty group
    pub fn create_group(&self, log_group_name: &str) {
        self.with_state(|state| {
            state.groups.entry(log_group_name.to_string()).or_default();
        });
    }

    /// Create an empty stream, creating the group if needed
    pub fn create_stream(&self, log_group_name: &str, log_stream_name: &str) {
        self.with_state(|state| {
            let streams = state.groups.entry(log_group_name.to_string()).or_default();
            if !streams.iter().any(|s| s.summary.name == log_stream_name) {
                streams.push(MemoryStream {
                    summary: LogStreamSummary::new(log_stream_name, None),
                    events: Vec::new(),
                });
            }
        });
    }

    /// Append an event; the stream's last event time follows the newest event
    pub fn put_event(&self, log_group_name: &str, log_stream_name: &str, timestamp: i64, message: &str) {
        self.create_stream(log_group_name, log_stream_name);
        self.with_state(|state| {
            if let Some(stream) = state
                .groups
                .get_mut(log_group_name)
                .and_then(|streams| streams.iter_mut().find(|s| s.summary.name == log_stream_name))
            {
                stream
                    .events
                    .push(LogEvent::new(timestamp, message, log_stream_name));
                stream.events.sort_by_key(|event| event.timestamp);

                let last = stream.summary.last_event_timestamp.unwrap_or(i64::MIN);
                stream.summary.last_event_timestamp = Some(last.max(timestamp));
                let first = stream.summary.first_event_timestamp.unwrap_or(i64::MAX);
                stream.summary.first_event_timestamp = Some(first.min(timestamp));
            }
        });
    }

    /// Make the next call fail with `message`
    pub fn fail_next(&self, message: &str) {
        self.with_state(|state| state.pending_failures.push_back(message.to_string()));
    }

    pub fn stream_listings(&self) -> u32 {
        self.with_state(|state| state.stream_listings)
    }

    pub fn event_fetches(&self) -> u32 {
        self.with_state(|state| state.event_fetches)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait]
impl LogSource for MemoryLogSource {
    async fn streams_by_last_event(
        &self,
        log_group_name: &str,
    ) -> Result<Option<Vec<LogStreamSummary>>> {
        self.with_state(|state| {
            state.stream_listings += 1;
            if let Some(message) = state.pending_failures.pop_front() {
                return Err(anyhow!(message));
            }

            Ok(state.groups.get(log_group_name).map(|streams| {
                let mut summaries: Vec<LogStreamSummary> =
                    streams.iter().map(|s| s.summary.clone()).collect();
                // Descending by last event time, streams that never logged last
                summaries.sort_by(|a, b| b.last_event_timestamp.cmp(&a.last_event_timestamp));
                summaries
            }))
        })
    }

    async fn recent_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        limit: i32,
    ) -> Result<Vec<LogEvent>> {
        self.with_state(|state| {
            state.event_fetches += 1;
            if let Some(message) = state.pending_failures.pop_front() {
                return Err(anyhow!(message));
            }

            let Some(stream) = state
                .groups
                .get(log_group_name)
                .and_then(|streams| streams.iter().find(|s| s.summary.name == log_stream_name))
            else {
                return Ok(Vec::new());
            };

            let limit = usize::try_from(limit.max(1)).unwrap_or(1);
            let skip = stream.events.len().saturating_sub(limit);
            Ok(stream.events[skip..].to_vec())
        })
    }
}
