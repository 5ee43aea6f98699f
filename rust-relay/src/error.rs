//! Error types for startup and delivery.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that prevent the relay from starting.
///
/// Every variant is fatal: the process exits before the ingress binds.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The routing keys file could not be read.
    #[error("failed to read routing keys from {path}: {source}")]
    KeysFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The routing keys file is not valid CSV.
    #[error("failed to parse routing keys in {path}: {source}")]
    KeysFormat {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// No routing key is provisioned for this container's index.
    #[error("no routing key for container index {index} ({available} available)")]
    KeyUnavailable { index: usize, available: usize },

    /// The selected routing key is blank.
    #[error("routing key at index {index} is empty")]
    EmptyKey { index: usize },

    /// The events API refused the verification event.
    #[error("routing key rejected by events API: HTTP {status_code}")]
    KeyRejected { status_code: u16 },

    /// The verification event could not be sent.
    #[error("routing key verification failed: {0}")]
    Verification(#[source] reqwest::Error),
}

/// Outcome of a delivery attempt that did not produce a usable response.
///
/// Both variants mean "delivery not confirmed" and lead to a tail re-queue.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Connection, TLS or timeout failure before a response was read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not JSON.
    #[error("malformed response (HTTP {status_code}): {body_preview}")]
    MalformedResponse { status_code: u16, body_preview: String },
}

impl DeliveryError {
    /// Status code of the failed response, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeliveryError::Transport(e) => e.status().map(|s| s.as_u16()),
            DeliveryError::MalformedResponse { status_code, .. } => Some(*status_code),
        }
    }
}
