//! Log-tail poller.
//!
//! Reads the newest events of the most recently active stream in a log
//! group, and waits (with capped exponential backoff) until those events
//! show that an action was recorded.

#![warn(clippy::all, rust_2018_idioms)]

use std::time::Duration;
use tokio::time::Instant;

use crate::app::sdk_errors::categorize_error;

use super::delay::delay;
use super::expectation::LogExpectation;
use super::source::LogSource;
use super::types::{
    EmptyReason, LogEvent, LogStreamSummary, TailOptions, TailOutcome, WaitOutcome, WaitPolicy,
};

/// Stream with the greatest last-event time
///
/// Ties keep the stream listed first; streams that never logged lose to any
/// stream that did, but are still chosen when nothing else exists.
pub fn select_latest_stream(streams: &[LogStreamSummary]) -> Option<&LogStreamSummary> {
    let mut best: Option<&LogStreamSummary> = None;
    for stream in streams {
        match best {
            Some(current) if stream.last_event_timestamp <= current.last_event_timestamp => {}
            _ => best = Some(stream),
        }
    }
    best
}

/// Tails log groups through a [`LogSource`]
pub struct LogTailPoller<S> {
    source: S,
    options: TailOptions,
}

impl<S: LogSource> LogTailPoller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            options: TailOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TailOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> TailOptions {
        self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Newest events of the most recently active stream in `log_group_name`
    ///
    /// Never fails: a missing group, a group without streams and an empty
    /// stream come back as [`TailOutcome::Empty`], service and transport
    /// errors as [`TailOutcome::Fault`].
    pub async fn tail(&self, log_group_name: &str) -> TailOutcome {
        let log_group_name = log_group_name.trim();
        if log_group_name.is_empty() {
            log_debug!("Skipping tail of blank log group name");
            return TailOutcome::Empty(EmptyReason::BlankGroupName);
        }

        let streams = match self.source.streams_by_last_event(log_group_name).await {
            Ok(Some(streams)) => streams,
            Ok(None) => return TailOutcome::Empty(EmptyReason::GroupNotFound),
            Err(err) => {
                let category = categorize_error(&err, self.source.service_name(), "DescribeLogStreams");
                log_error!("Failed to list streams of {}: {:#}", log_group_name, err);
                return TailOutcome::Fault(category);
            }
        };

        let Some(latest) = select_latest_stream(&streams) else {
            return TailOutcome::Empty(EmptyReason::NoStreams);
        };

        let limit = self.options.limit;
        let mut events = match self
            .source
            .recent_events(log_group_name, &latest.name, limit)
            .await
        {
            Ok(events) => events,
            Err(err) => {
                let category = categorize_error(&err, self.source.service_name(), "GetLogEvents");
                log_error!(
                    "Failed to read events of {} / {}: {:#}",
                    log_group_name,
                    latest.name,
                    err
                );
                return TailOutcome::Fault(category);
            }
        };

        if events.is_empty() {
            return TailOutcome::Empty(EmptyReason::NoEventsInStream);
        }

        // Sources may hand back more than asked for; keep the newest.
        let limit = usize::try_from(limit.max(1)).unwrap_or(1);
        if events.len() > limit {
            events.drain(..events.len() - limit);
        }

        log_debug!(
            "Tail of {} / {} returned {} events",
            log_group_name,
            latest.name,
            events.len()
        );
        TailOutcome::Events(events)
    }

    /// [`tail`](Self::tail) projected onto a plain list; empty on anything but success
    pub async fn tail_events(&self, log_group_name: &str) -> Vec<LogEvent> {
        let outcome = self.tail(log_group_name).await;
        if let TailOutcome::Fault(fault) = &outcome {
            log_warn!("Tail of {} faulted, returning no events: {}", log_group_name, fault);
        }
        outcome.into_events()
    }

    /// Wait a fixed time, then tail once
    pub async fn settle_then_tail(&self, log_group_name: &str, settle: Duration) -> TailOutcome {
        delay(settle).await;
        self.tail(log_group_name).await
    }

    /// Tail repeatedly until `expectation` holds or `policy.timeout` passes
    ///
    /// Sleeps grow from `initial_delay` by `multiplier` up to `max_delay`;
    /// the last sleep is shortened so one final poll happens at the deadline.
    /// Retryable faults are polled through, other faults end the wait.
    pub async fn wait_for(
        &self,
        log_group_name: &str,
        expectation: &LogExpectation,
        policy: &WaitPolicy,
    ) -> WaitOutcome {
        let start = Instant::now();
        // A timeout past what `Instant` can represent means no deadline
        let deadline = start.checked_add(policy.timeout);
        let mut next_delay = policy.initial_delay;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let outcome = self.tail(log_group_name).await;

            match &outcome {
                TailOutcome::Events(events) if expectation.is_met_by(events) => {
                    log_info!(
                        "{} satisfied in {} after {} attempt(s)",
                        expectation,
                        log_group_name,
                        attempts
                    );
                    return WaitOutcome::Satisfied {
                        events: events.clone(),
                        attempts,
                        elapsed: start.elapsed(),
                    };
                }
                TailOutcome::Fault(fault) if !fault.is_retryable() => {
                    log_error!(
                        "Giving up on {} after {} attempt(s): {}",
                        log_group_name,
                        attempts,
                        fault
                    );
                    return WaitOutcome::Aborted {
                        fault: fault.clone(),
                        attempts,
                    };
                }
                _ => {}
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                log_warn!(
                    "Timed out after {} attempt(s) waiting for {} in {}",
                    attempts,
                    expectation,
                    log_group_name
                );
                return WaitOutcome::TimedOut {
                    last: outcome,
                    attempts,
                    elapsed: start.elapsed(),
                };
            }

            let sleep_for = match deadline {
                Some(deadline) => next_delay.min(deadline - now),
                None => next_delay,
            };
            log_debug!(
                "Attempt {} on {} not satisfied ({}), retrying in {:?}",
                attempts,
                log_group_name,
                describe(&outcome),
                sleep_for
            );
            tokio::time::sleep(sleep_for).await;
            next_delay = policy.next_delay(next_delay);
        }
    }
}

fn describe(outcome: &TailOutcome) -> String {
    match outcome {
        TailOutcome::Events(events) => format!("{} events", events.len()),
        TailOutcome::Empty(reason) => reason.to_string(),
        TailOutcome::Fault(fault) => fault.short_label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::data_plane::cloudwatch_logs::MemoryLogSource;
    use crate::app::sdk_errors::ErrorCategory;

    #[test]
    fn test_select_latest_stream_prefers_newest() {
        let streams = vec![
            LogStreamSummary::new("a", Some(100)),
            LogStreamSummary::new("b", Some(200)),
            LogStreamSummary::new("c", None),
        ];
        assert_eq!(select_latest_stream(&streams).unwrap().name, "b");
    }

    #[test]
    fn test_select_latest_stream_ties_keep_first() {
        let streams = vec![
            LogStreamSummary::new("first", Some(500)),
            LogStreamSummary::new("second", Some(500)),
        ];
        assert_eq!(select_latest_stream(&streams).unwrap().name, "first");
    }

    #[test]
    fn test_select_latest_stream_without_events() {
        let streams = vec![LogStreamSummary::new("idle", None)];
        assert_eq!(select_latest_stream(&streams).unwrap().name, "idle");
        assert!(select_latest_stream(&[]).is_none());
    }

    #[tokio::test]
    async fn test_blank_group_does_not_call_source() {
        let poller = LogTailPoller::new(MemoryLogSource::new());
        assert_eq!(
            poller.tail("   ").await,
            TailOutcome::Empty(EmptyReason::BlankGroupName)
        );
        assert_eq!(poller.source().stream_listings(), 0);
    }

    #[tokio::test]
    async fn test_group_without_streams() {
        let source = MemoryLogSource::new();
        source.create_group("/var/log/cloudxserverless-app");
        let poller = LogTailPoller::new(source);

        assert_eq!(
            poller.tail("/var/log/cloudxserverless-app").await,
            TailOutcome::Empty(EmptyReason::NoStreams)
        );
    }

    #[tokio::test]
    async fn test_fault_is_categorized() {
        let source = MemoryLogSource::new();
        source.fail_next("AccessDeniedException: not allowed");
        let poller = LogTailPoller::new(source);

        let outcome = poller.tail("/app").await;
        assert!(matches!(
            outcome.fault(),
            Some(ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            })
        ));
        assert!(poller.tail_events("/app").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_multiplier_caps_at_max_delay() {
        let source = MemoryLogSource::new();
        let policy = WaitPolicy::new(
            Duration::from_secs(1),
            Duration::from_secs(15),
            Duration::from_secs(40),
        )
        .with_multiplier(1e300);

        let outcome = LogTailPoller::new(source)
            .wait_for("/app", &LogExpectation::latest_contains("x"), &policy)
            .await;

        // 0s, 1s, 16s, 31s, then clamped to 40s
        assert!(matches!(outcome, WaitOutcome::TimedOut { attempts: 5, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_waits_without_deadline() {
        let source = std::sync::Arc::new(MemoryLogSource::new());
        source.fail_next("ThrottlingException: Rate exceeded");
        source.put_event("/app", "s", 1, "POST /api/image HTTP/1.1");
        let policy = WaitPolicy::new(Duration::from_secs(1), Duration::from_secs(15), Duration::MAX);

        let outcome = LogTailPoller::new(source)
            .wait_for("/app", &LogExpectation::latest_contains("POST"), &policy)
            .await;

        assert!(outcome.is_satisfied());
        assert_eq!(outcome.attempts(), 2);
    }

    #[tokio::test]
    async fn test_limit_applies() {
        let source = MemoryLogSource::new();
        for ts in 0..20 {
            source.put_event("/app", "s", ts, &format!("line {}", ts));
        }
        let poller = LogTailPoller::new(source).with_options(TailOptions::new().with_limit(3));

        let events = poller.tail("/app").await.into_events();
        let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["line 17", "line 18", "line 19"]);
    }
}
