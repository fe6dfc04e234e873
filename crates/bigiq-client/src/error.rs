//! BIG-IQ client error types.
//!
//! Every variant names the endpoint or operation it came from. The variants
//! map onto the failure classes callers need to tell apart:
//!
//! - transport failures (`Http`) are never retried by this crate;
//! - control-plane error bodies (`Api`, `Status`) keep the raw body;
//! - `ProtocolViolation` means the response was well-formed but unusable;
//! - `TerminalFailure` and `PartialSuccess` describe the entity's outcome,
//!   not the call's;
//! - a 404 is the only condition callers may fold into "absent" (see
//!   [`BigIqError::is_not_found`]).

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Structured error body returned by the control plane.
///
/// Wire shape: `{"code": 404, "message": "...", "errorStack": ["..."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_stack: Vec<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "error code {} without message", self.code)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Errors from BIG-IQ calls and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum BigIqError {
    /// Connection failure, timeout, or an unreadable response body.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The control plane answered >= 400 with a parseable error body.
    #[error("BIG-IQ {endpoint} returned {status}: {error}")]
    Api {
        endpoint: String,
        status: u16,
        error: ApiErrorBody,
        /// Raw response body, kept for diagnostics.
        body: String,
    },
    /// The control plane answered >= 400 without a structured error body.
    #[error("BIG-IQ {endpoint} returned HTTP {status} :: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: serde_json::Error,
    },
    /// Request body serialization failed.
    #[error("failed to serialize request for {endpoint}: {source}")]
    Serialization {
        endpoint: String,
        source: serde_json::Error,
    },
    /// Well-formed response missing something the caller depends on.
    #[error("protocol violation from {endpoint}: {detail}")]
    ProtocolViolation { endpoint: String, detail: String },
    /// The entity itself reached a failed state.
    #[error("{entity} reached {status}: {message}")]
    TerminalFailure {
        entity: String,
        status: String,
        message: String,
    },
    /// A batch where some units succeeded and others failed.
    #[error("partial success: succeeded [{}], failed [{}]", .succeeded.join(","), .failed.join(","))]
    PartialSuccess {
        succeeded: Vec<String>,
        failed: Vec<String>,
    },
    /// The operation required an entity that does not exist.
    #[error("{entity} not found")]
    NotFound { entity: String },
    /// A poll loop ran out of time or attempts.
    #[error("{operation} still {last_status} after {waited:?}")]
    DeadlineExceeded {
        operation: String,
        waited: Duration,
        last_status: String,
    },
    /// A poll loop was cancelled by the caller.
    #[error("{operation} cancelled")]
    Cancelled { operation: String },
    /// Rejected locally, before any request was sent.
    #[error("invalid request: {0}")]
    Validation(String),
    /// The upload byte source failed.
    #[error("byte source read failed: {0}")]
    Io(#[from] std::io::Error),
    /// Login did not yield a token.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl BigIqError {
    /// Whether this error means "the entity does not exist".
    ///
    /// True for a structured error body whose HTTP status or `code` is 404,
    /// and for [`BigIqError::NotFound`]. A 404 with an unstructured body (a proxy
    /// page, say) is not treated as absence.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, error, .. } => *status == 404 || error.code == 404,
            Self::NotFound { .. } => true,
            _ => false,
        }
    }

    /// HTTP status of an error response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The human-readable `message` the control plane attached to an error
    /// response, when one can be extracted.
    pub fn server_message(&self) -> Option<String> {
        match self {
            Self::Api { error, .. } if !error.message.is_empty() => Some(error.message.clone()),
            Self::Api { body, .. } | Self::Status { body, .. } => message_field(body),
            Self::TerminalFailure { message, .. } => Some(message.clone()),
            _ => None,
        }
    }
}

fn message_field(body: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(body).ok()? {
        serde_json::Value::Object(map) => match map.get("message") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Decode a JSON response body, labelling failures with the endpoint.
pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, bytes: &[u8]) -> Result<T, BigIqError> {
    serde_json::from_slice(bytes).map_err(|e| BigIqError::Deserialization {
        endpoint: endpoint.to_string(),
        source: e,
    })
}

/// Decode a required wire status into its closed enum.
///
/// A missing field and an unrecognised value are both protocol violations;
/// neither is defaulted.
pub(crate) fn require_status<S: std::str::FromStr>(
    endpoint: &str,
    what: &str,
    raw: Option<&str>,
) -> Result<S, BigIqError> {
    let raw = raw.ok_or_else(|| BigIqError::ProtocolViolation {
        endpoint: endpoint.to_string(),
        detail: format!("{what} status not available"),
    })?;
    raw.parse().map_err(|_| BigIqError::ProtocolViolation {
        endpoint: endpoint.to_string(),
        detail: format!("unrecognised {what} status {raw:?}"),
    })
}
