//! Fixed-duration waits.
//!
//! Unconditional sleeps used between triggering an action and reading the
//! logs. Prefer [`LogTailPoller::wait_for`](super::LogTailPoller::wait_for),
//! which stops as soon as the expected line shows up.

#![warn(clippy::all, rust_2018_idioms)]

use std::time::Duration;

/// Sleep for `duration`
pub async fn delay(duration: Duration) {
    if !duration.is_zero() {
        log_debug!("Waiting {:?} for log ingestion", duration);
        tokio::time::sleep(duration).await;
    }
}

/// Sleep for a number of seconds; negative or non-finite values do not wait
pub async fn delay_secs(seconds: f64) {
    delay(secs_to_duration(seconds)).await
}

fn secs_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_duration_clamps() {
        assert_eq!(secs_to_duration(1.5), Duration::from_millis(1_500));
        assert_eq!(secs_to_duration(-3.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::INFINITY), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_waits_full_duration() {
        let start = tokio::time::Instant::now();
        delay_secs(55.0).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(55));
        assert!(elapsed < Duration::from_secs(56));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_returns_immediately() {
        let start = tokio::time::Instant::now();
        delay_secs(0.0).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
