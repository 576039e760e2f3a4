// Error types for seedprobe
// Programming/configuration errors are raised from audit(); transport errors stay per-unit

use thiserror::Error;

/// Errors surfaced to callers of the audit engine.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A detection pattern failed to compile
    #[error("invalid detection pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Audit options that can never produce a unit
    #[error("invalid audit options: {0}")]
    InvalidOptions(String),

    /// An element or page carried a URL that cannot be parsed
    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Terminal failure of a single dispatched request.
///
/// These never abort a scan: the unit that produced the request moves to
/// FAILED and nothing is logged for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no response from {url}: {reason}")]
    NoResponse { url: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} could not be built: {reason}")]
    InvalidRequest { url: String, reason: String },
}

impl TransportError {
    pub fn url(&self) -> &str {
        match self {
            TransportError::NoResponse { url, .. }
            | TransportError::Timeout { url }
            | TransportError::InvalidRequest { url, .. } => url,
        }
    }
}

impl TransportError {
    /// Classify a reqwest error, locating it at `url` when reqwest does not.
    ///
    /// Builder errors never carry a URL of their own.
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());
        if err.is_timeout() {
            TransportError::Timeout { url }
        } else if err.is_builder() {
            TransportError::InvalidRequest {
                url,
                reason: err.to_string(),
            }
        } else {
            TransportError::NoResponse {
                url,
                reason: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::from_reqwest(err, "")
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_reports_its_url() {
        let err = TransportError::Timeout {
            url: "http://test.local/slow".to_string(),
        };
        assert_eq!(err.url(), "http://test.local/slow");
        assert_eq!(err.to_string(), "request to http://test.local/slow timed out");
    }

    #[test]
    fn transport_error_converts_into_audit_error() {
        let err: AuditError = TransportError::NoResponse {
            url: "http://test.local/".to_string(),
            reason: "connection refused".to_string(),
        }
        .into();
        assert!(matches!(err, AuditError::Transport(_)));
    }
}
