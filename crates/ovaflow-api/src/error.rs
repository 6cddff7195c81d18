use ovaflow_core::{CoreError, ResourceKind};
use thiserror::Error;

/// Top-level error type for the `ovaflow-api` crate.
///
/// Covers authentication handshakes, transport failures and structured
/// error bodies from the vSphere, NSX and VMC endpoints. Gateways translate
/// these into `CoreError` with the resource they were working on.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or token exchange rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session token or access token is no longer accepted.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Remote API ──────────────────────────────────────────────────
    /// Non-success response with the server's message.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Server error type or code, e.g. `com.vmware.vapi.std.errors.not_found`.
        code: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A spec or id the endpoint cannot represent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Routing ─────────────────────────────────────────────────────
    /// The gateway does not own this kind or operation.
    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        kind: ResourceKind,
        operation: &'static str,
    },
}

impl Error {
    /// HTTP status of a structured API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Translate with the identity of the object the call was about, so
    /// 404/409/412 become typed core errors.
    pub fn for_resource(self, kind: ResourceKind, id: &str) -> CoreError {
        match self.status() {
            Some(404) => CoreError::NotFound {
                kind,
                id: id.to_owned(),
            },
            Some(409) => CoreError::Conflict {
                kind,
                id: id.to_owned(),
            },
            Some(412) => CoreError::VersionConflict {
                kind,
                id: id.to_owned(),
            },
            _ => self.into(),
        }
    }
}

// ── Conversion into core errors ──────────────────────────────────────

impl From<Error> for CoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::Authentication { message } => CoreError::Authentication { message },
            Error::SessionExpired => CoreError::Authentication {
                message: "Session expired -- re-authentication required".into(),
            },
            Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::Connection {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        status: e.status().map(|s| s.as_u16()),
                        message: e.to_string(),
                    }
                }
            }
            Error::InvalidUrl(e) => CoreError::Connection {
                reason: format!("Invalid URL: {e}"),
            },
            Error::Tls(msg) => CoreError::Connection {
                reason: format!("TLS error: {msg}"),
            },
            Error::Api {
                status: 401,
                message,
                ..
            } => CoreError::Authentication { message },
            Error::Api {
                status, message, ..
            } => CoreError::Api {
                status: Some(status),
                message,
            },
            Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            Error::InvalidRequest(message) => CoreError::Internal(message),
            Error::Unsupported { kind, operation } => CoreError::Unsupported { kind, operation },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> Error {
        Error::Api {
            status,
            message: "boom".into(),
            code: None,
        }
    }

    #[test]
    fn statuses_map_to_typed_core_errors() {
        let kind = ResourceKind::Segment;
        assert!(matches!(
            api(404).for_resource(kind, "s"),
            CoreError::NotFound { .. }
        ));
        assert!(matches!(
            api(409).for_resource(kind, "s"),
            CoreError::Conflict { .. }
        ));
        assert!(matches!(
            api(412).for_resource(kind, "s"),
            CoreError::VersionConflict { .. }
        ));
        assert!(matches!(
            api(401).for_resource(kind, "s"),
            CoreError::Authentication { .. }
        ));
        assert!(matches!(
            api(500).for_resource(kind, "s"),
            CoreError::Api {
                status: Some(500),
                ..
            }
        ));
    }
}
