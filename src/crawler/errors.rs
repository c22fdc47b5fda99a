//! Page- and item-level failure types
//!
//! These never abort a run on their own: the walker returns them alongside a
//! partial result and the coordinator stores them per work item.

use std::fmt;
use thiserror::Error;

/// Failure to retrieve a page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, DNS failure, broken body stream...
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The fetch did not complete within the configured timeout
    #[error("request timeout for {url}")]
    Timeout { url: String },
}

impl FetchError {
    /// Classifies a reqwest error for the given URL
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_connect() {
            Self::Network {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Failure to turn one page into its expected content
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An expected structural element is missing from the HTML
    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    /// A required business field is missing from a detail page
    #[error("missing required field '{field}' on {url}")]
    MissingField { url: String, field: &'static str },

    /// A pagination cursor pointed back to an already visited page
    #[error("pagination cycle detected at {url}")]
    Cycle { url: String },

    /// The run was cancelled before this work was dispatched
    #[error("cancelled before fetching {url}")]
    Cancelled { url: String },

    /// The task running this item panicked or was aborted
    #[error("worker failure for {url}: {message}")]
    Worker { url: String, message: String },
}

impl ExtractError {
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// The skip-count bucket this failure belongs to
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch(FetchError::Timeout { .. }) => FailureKind::Timeout,
            Self::Fetch(_) => FailureKind::Fetch,
            Self::Parse { .. } => FailureKind::Parse,
            Self::MissingField { .. } => FailureKind::MissingField,
            Self::Cycle { .. } => FailureKind::Cycle,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::Worker { .. } => FailureKind::Worker,
        }
    }
}

/// Failure categories used for per-kind skip counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    Fetch,
    Timeout,
    Parse,
    MissingField,
    Cycle,
    Cancelled,
    Worker,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Timeout => "timeout",
            Self::Parse => "parse",
            Self::MissingField => "missing_field",
            Self::Cycle => "cycle",
            Self::Cancelled => "cancelled",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_has_its_own_kind() {
        let err = ExtractError::from(FetchError::Timeout {
            url: "http://a/".to_string(),
        });
        assert_eq!(err.kind(), FailureKind::Timeout);

        let err = ExtractError::from(FetchError::Status {
            url: "http://a/".to_string(),
            status: 404,
        });
        assert_eq!(err.kind(), FailureKind::Fetch);
    }

    #[test]
    fn test_error_messages() {
        let err = ExtractError::MissingField {
            url: "http://a/".to_string(),
            field: "title",
        };
        assert_eq!(err.to_string(), "missing required field 'title' on http://a/");

        let err = ExtractError::from(FetchError::Status {
            url: "http://a/".to_string(),
            status: 503,
        });
        assert_eq!(err.to_string(), "HTTP 503 for http://a/");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(FailureKind::MissingField.to_string(), "missing_field");
        assert_eq!(FailureKind::Cycle.as_str(), "cycle");
    }
}
