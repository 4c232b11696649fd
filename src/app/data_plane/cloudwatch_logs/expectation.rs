//! Conditions a verification run waits for in the tail of a log group.

#![warn(clippy::all, rust_2018_idioms)]

use std::fmt;

use super::types::LogEvent;

/// What the events of a tail must contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogExpectation {
    /// The newest event's message contains the substring
    LatestContains(String),
    /// The newest event contains the substring and is newer than `after`
    /// (Unix milliseconds), so a line logged before a baseline never counts
    LatestContainsAfter { needle: String, after: i64 },
    /// At least one event's message contains the substring
    AnyContains(String),
    /// Every substring appears in at least one event's message
    AllPresent(Vec<String>),
}

impl LogExpectation {
    pub fn latest_contains(needle: impl Into<String>) -> Self {
        LogExpectation::LatestContains(needle.into())
    }

    pub fn latest_contains_after(needle: impl Into<String>, after: i64) -> Self {
        LogExpectation::LatestContainsAfter {
            needle: needle.into(),
            after,
        }
    }

    pub fn any_contains(needle: impl Into<String>) -> Self {
        LogExpectation::AnyContains(needle.into())
    }

    pub fn all_present<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LogExpectation::AllPresent(needles.into_iter().map(Into::into).collect())
    }

    /// Check the expectation against events ordered oldest first
    pub fn is_met_by(&self, events: &[LogEvent]) -> bool {
        match self {
            LogExpectation::LatestContains(needle) => events
                .last()
                .is_some_and(|event| event.message.contains(needle.as_str())),
            LogExpectation::LatestContainsAfter { needle, after } => events.last().is_some_and(
                |event| event.timestamp > *after && event.message.contains(needle.as_str()),
            ),
            LogExpectation::AnyContains(needle) => events
                .iter()
                .any(|event| event.message.contains(needle.as_str())),
            LogExpectation::AllPresent(needles) => {
                !events.is_empty()
                    && needles.iter().all(|needle| {
                        events
                            .iter()
                            .any(|event| event.message.contains(needle.as_str()))
                    })
            }
        }
    }

    /// Substrings not found in any event (all of them for an unmet latest check)
    pub fn missing<'a>(&'a self, events: &[LogEvent]) -> Vec<&'a str> {
        match self {
            LogExpectation::LatestContains(needle)
            | LogExpectation::LatestContainsAfter { needle, .. }
            | LogExpectation::AnyContains(needle) => {
                if self.is_met_by(events) {
                    Vec::new()
                } else {
                    vec![needle.as_str()]
                }
            }
            LogExpectation::AllPresent(needles) => needles
                .iter()
                .filter(|needle| !events.iter().any(|e| e.message.contains(needle.as_str())))
                .map(String::as_str)
                .collect(),
        }
    }
}

impl fmt::Display for LogExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogExpectation::LatestContains(needle) => write!(f, "latest event contains {:?}", needle),
            LogExpectation::LatestContainsAfter { needle, after } => write!(
                f,
                "latest event after {} contains {:?}",
                after, needle
            ),
            LogExpectation::AnyContains(needle) => write!(f, "some event contains {:?}", needle),
            LogExpectation::AllPresent(needles) => write!(f, "events contain all of {:?}", needles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(messages: &[&str]) -> Vec<LogEvent> {
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| LogEvent::new(i as i64, *m, "stream"))
            .collect()
    }

    #[test]
    fn test_latest_contains_only_checks_newest() {
        let tail = events(&["POST /api/image HTTP/1.1", "GET /api/image HTTP/1.1"]);
        assert!(LogExpectation::latest_contains("GET /api/image").is_met_by(&tail));
        assert!(!LogExpectation::latest_contains("POST /api/image").is_met_by(&tail));
        assert!(LogExpectation::any_contains("POST /api/image").is_met_by(&tail));
    }

    #[test]
    fn test_all_present_across_messages() {
        let tail = events(&[
            "object_key=images/cat.jpg object_type=image/jpeg",
            "last_modified=2024-01-01 object_size=1024",
            "download_link=https://example.invalid/cat.jpg",
        ]);
        let expectation = LogExpectation::all_present([
            "object_key",
            "object_type",
            "last_modified",
            "object_size",
            "download_link",
        ]);
        assert!(expectation.is_met_by(&tail));

        let partial = &tail[..1];
        assert_eq!(
            expectation.missing(partial),
            vec!["last_modified", "object_size", "download_link"]
        );
    }

    #[test]
    fn test_latest_contains_after_ignores_lines_before_baseline() {
        // "POST" logged at t=0 is older than the baseline at t=1
        let tail = events(&["POST /api/image HTTP/1.1", "GET /api/image HTTP/1.1"]);
        let expectation = LogExpectation::latest_contains_after("POST /api/image", 1);
        assert!(!expectation.is_met_by(&tail));
        assert_eq!(expectation.missing(&tail), vec!["POST /api/image"]);

        let mut newer = tail.clone();
        newer.push(LogEvent::new(2, "POST /api/image HTTP/1.1", "stream"));
        assert!(expectation.is_met_by(&newer));

        // Same timestamp as the baseline is not newer
        let same = vec![LogEvent::new(1, "POST /api/image HTTP/1.1", "stream")];
        assert!(!expectation.is_met_by(&same));
    }

    #[test]
    fn test_nothing_is_met_by_empty_tail() {
        assert!(!LogExpectation::latest_contains("x").is_met_by(&[]));
        assert!(!LogExpectation::any_contains("x").is_met_by(&[]));
        assert!(!LogExpectation::latest_contains_after("x", 0).is_met_by(&[]));
        assert!(!LogExpectation::AllPresent(Vec::new()).is_met_by(&[]));
    }
}
