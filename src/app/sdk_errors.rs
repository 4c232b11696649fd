//! AWS SDK error categorization.
//!
//! A probe needs to tell "the logging pipeline has not caught up yet" apart
//! from "this will never work". Transient failures (throttling, timeouts,
//! network trouble, AWS-side 5xx) are worth polling through; permission and
//! validation failures are not.

use std::fmt;

/// Categorized AWS SDK failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request was throttled due to rate limiting
    Throttled { service: String, error_code: String },
    /// Request timed out
    Timeout { operation: String },
    /// Network connectivity issues
    NetworkError { message: String },
    /// AWS service temporarily unavailable
    ServiceUnavailable { service: String, message: String },
    /// Permissions, validation and everything else a retry will not fix
    NonRetryable {
        code: String,
        message: String,
        is_permission_error: bool,
    },
}

impl ErrorCategory {
    /// Returns true if polling again may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCategory::NonRetryable { .. })
    }

    /// One-line description for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ErrorCategory::Throttled { service, .. } => format!("{} rate limited", service),
            ErrorCategory::Timeout { operation } => format!("{} timeout", operation),
            ErrorCategory::NetworkError { .. } => "Network error".to_string(),
            ErrorCategory::ServiceUnavailable { service, .. } => {
                format!("{} unavailable", service)
            }
            ErrorCategory::NonRetryable { code, .. } => code.clone(),
        }
    }

    /// Short label for compact display
    pub fn short_label(&self) -> &'static str {
        match self {
            ErrorCategory::Throttled { .. } => "throttled",
            ErrorCategory::Timeout { .. } => "timeout",
            ErrorCategory::NetworkError { .. } => "network",
            ErrorCategory::ServiceUnavailable { .. } => "unavailable",
            ErrorCategory::NonRetryable { .. } => "error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::NetworkError { message }
            | ErrorCategory::ServiceUnavailable { message, .. }
            | ErrorCategory::NonRetryable { message, .. } => {
                write!(f, "{} ({}): {}", self.user_message(), self.short_label(), message)
            }
            _ => write!(f, "{} ({})", self.user_message(), self.short_label()),
        }
    }
}

/// Categorize an `anyhow::Error` that wraps an SDK error
///
/// The full context chain is inspected since the SDK's own `Display` often
/// stops at "service error" and hides the error code.
pub fn categorize_error(error: &anyhow::Error, service: &str, operation: &str) -> ErrorCategory {
    let detail = format!("{:#} {:?}", error, error);
    categorize_error_string(&detail, service, operation)
}

/// Categorize an error based on its string representation
pub fn categorize_error_string(error_str: &str, service: &str, operation: &str) -> ErrorCategory {
    const THROTTLING: &[&str] = &[
        "ThrottlingException",
        "Throttling",
        "TooManyRequestsException",
        "RequestLimitExceeded",
        "LimitExceededException",
        "RateExceeded",
    ];
    const TIMEOUT: &[&str] = &["TimeoutError", "timeout", "timed out", "deadline exceeded"];
    const NETWORK: &[&str] = &[
        "DispatchFailure",
        "connection",
        "Connection",
        "network",
        "Network",
        "DNS",
        "socket",
    ];
    const UNAVAILABLE: &[&str] = &[
        "ServiceUnavailable",
        "InternalServerError",
        "InternalServerException",
        "InternalError",
        "Service Unavailable",
    ];
    const PERMISSION: &[&str] = &[
        "AccessDenied",
        "UnauthorizedOperation",
        "UnrecognizedClientException",
        "InvalidClientTokenId",
        "ExpiredToken",
        "SignatureDoesNotMatch",
    ];

    let contains_any = |needles: &[&str]| needles.iter().any(|n| error_str.contains(n));

    // Permission problems often mention "connection" in their debug output,
    // so they are checked first.
    if contains_any(PERMISSION) {
        return ErrorCategory::NonRetryable {
            code: extract_error_code(error_str).unwrap_or_else(|| "AccessDenied".to_string()),
            message: truncate_message(error_str, 200),
            is_permission_error: true,
        };
    }

    if contains_any(THROTTLING) {
        return ErrorCategory::Throttled {
            service: service.to_string(),
            error_code: extract_error_code(error_str).unwrap_or_else(|| "Throttling".to_string()),
        };
    }

    if contains_any(TIMEOUT) {
        return ErrorCategory::Timeout {
            operation: operation.to_string(),
        };
    }

    if contains_any(NETWORK) {
        return ErrorCategory::NetworkError {
            message: truncate_message(error_str, 100),
        };
    }

    if contains_any(UNAVAILABLE) {
        return ErrorCategory::ServiceUnavailable {
            service: service.to_string(),
            message: truncate_message(error_str, 100),
        };
    }

    ErrorCategory::NonRetryable {
        code: extract_error_code(error_str).unwrap_or_else(|| "Error".to_string()),
        message: truncate_message(error_str, 200),
        is_permission_error: false,
    }
}

/// Extract an AWS error code such as `ResourceNotFoundException`
fn extract_error_code(error_str: &str) -> Option<String> {
    // "ThrottlingException: Rate exceeded"
    if let Some(pos) = error_str.find(':') {
        let prefix = error_str[..pos].trim();
        let code = prefix.rsplit("::").next().unwrap_or(prefix);
        if (code.ends_with("Exception") || code.ends_with("Error"))
            && !code.contains(' ')
            && code.len() < 64
        {
            return Some(code.to_string());
        }
    }

    // code: Some("ValidationException") in debug output
    let start = error_str.find("code:")?;
    let after_code = &error_str[start + 5..];
    let quote_start = after_code.find('"')?;
    let after_quote = &after_code[quote_start + 1..];
    let quote_end = after_quote.find('"')?;
    let code = &after_quote[..quote_end];
    (!code.is_empty() && code.len() < 64).then(|| code.to_string())
}

/// Truncate to at most `max_len` bytes on a char boundary, adding an ellipsis
fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        return msg.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &msg[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_throttling() {
        let cat = categorize_error_string(
            "ThrottlingException: Rate exceeded",
            "CloudWatchLogs",
            "DescribeLogStreams",
        );
        assert_eq!(
            cat,
            ErrorCategory::Throttled {
                service: "CloudWatchLogs".to_string(),
                error_code: "ThrottlingException".to_string(),
            }
        );
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_categorize_timeout() {
        let cat = categorize_error_string(
            "TimeoutError: request timed out after 30s",
            "CloudWatchLogs",
            "GetLogEvents",
        );
        assert!(matches!(cat, ErrorCategory::Timeout { .. }));
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_categorize_network_error() {
        let cat = categorize_error_string("DispatchFailure: connection refused", "CloudTrail", "GetTrail");
        assert!(matches!(cat, ErrorCategory::NetworkError { .. }));
        assert_eq!(cat.short_label(), "network");
    }

    #[test]
    fn test_categorize_service_unavailable() {
        let cat = categorize_error_string(
            "ServiceUnavailableException: try again",
            "CloudWatchLogs",
            "GetLogEvents",
        );
        assert!(matches!(cat, ErrorCategory::ServiceUnavailable { .. }));
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_access_denied_wins_over_connection_wording() {
        let cat = categorize_error_string(
            "AccessDeniedException: not authorized (connection reused)",
            "CloudWatchLogs",
            "DescribeLogStreams",
        );
        assert!(matches!(
            cat,
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            }
        ));
        assert!(!cat.is_retryable());
    }

    #[test]
    fn test_categorize_validation_error() {
        let cat = categorize_error_string(
            "InvalidParameterException: bad group",
            "CloudWatchLogs",
            "GetLogEvents",
        );
        assert_eq!(cat.user_message(), "InvalidParameterException");
        assert!(!cat.is_retryable());
    }

    #[test]
    fn test_categorize_anyhow_chain() {
        let err = anyhow::anyhow!("ThrottlingException: slow down")
            .context("Failed to describe log streams");
        let cat = categorize_error(&err, "CloudWatchLogs", "DescribeLogStreams");
        assert!(matches!(cat, ErrorCategory::Throttled { .. }));
    }

    #[test]
    fn test_extract_error_code_from_debug_output() {
        assert_eq!(
            extract_error_code("service error, code: Some(\"ValidationException\")"),
            Some("ValidationException".to_string())
        );
        assert_eq!(extract_error_code("plain failure"), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let msg = "é".repeat(100);
        let truncated = truncate_message(&msg, 10);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 10);
    }
}
