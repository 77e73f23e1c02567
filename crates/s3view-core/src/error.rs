// ── Core error types ──
//
// User-facing errors from s3view-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<s3view_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Catalog is not connected")]
    Disconnected,

    #[error("Backend request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Image not found: {key}")]
    NotFound { key: String },

    #[error("Request for {key} was cancelled")]
    Cancelled { key: String },

    // ── Notification errors ──────────────────────────────────────────
    #[error("Unknown event kind '{value}'")]
    UnknownEventKind { value: String },

    #[error("Malformed notification: {reason}")]
    MalformedEvent { reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<s3view_api::Error> for CoreError {
    fn from(err: s3view_api::Error) -> Self {
        match err {
            s3view_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            s3view_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            s3view_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            s3view_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            s3view_api::Error::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            s3view_api::Error::GraphQl { messages } => CoreError::Api {
                message: messages.join("; "),
                status: None,
            },
            s3view_api::Error::NotFound { bucket, name } => CoreError::NotFound {
                key: format!("{bucket}/{name}"),
            },
            s3view_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            s3view_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            s3view_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_object_identity() {
        let err = CoreError::from(s3view_api::Error::NotFound {
            bucket: "b".into(),
            name: "dir/img".into(),
        });
        assert!(matches!(err, CoreError::NotFound { ref key } if key == "b/dir/img"));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = CoreError::from(s3view_api::Error::Http {
            status: 503,
            message: "busy".into(),
        });
        assert!(err.is_transient());

        let err = CoreError::from(s3view_api::Error::GraphQl {
            messages: vec!["bad query".into()],
        });
        assert!(!err.is_transient());
    }
}
