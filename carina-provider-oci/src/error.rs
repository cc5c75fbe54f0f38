//! Error types of the OCI provider

use carina_core::provider::ProviderError;
use carina_core::schema::TypeError;
use carina_core::waiter::WaitError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::golden_gate::models::{ActionType, InvalidEnumValue};

/// Errors returned by the OCI client layer and the resource adapters
#[derive(Debug, Error)]
pub enum OciError {
    /// The service answered with a non-success status
    #[error(
        "Service error: {code} (status {status}, opc-request-id {}): {message}",
        opc_request_id.as_deref().unwrap_or("-")
    )]
    Service {
        status: u16,
        code: String,
        message: String,
        opc_request_id: Option<String>,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    InvalidEnum(#[from] InvalidEnumValue),

    /// A work request ended without doing what was asked of it
    #[error(
        "work request did not succeed, workId: {work_request_id}, entity: {entity_type}, action: {action}. Message: {message}"
    )]
    WorkRequestFailed {
        work_request_id: String,
        entity_type: String,
        action: ActionType,
        message: String,
    },

    /// Waiting for a work request or lifecycle state gave up
    #[error(transparent)]
    Wait(Box<WaitError<OciError>>),

    #[error("{operation} response carried no opc-work-request-id header")]
    MissingWorkRequestId { operation: String },

    #[error("Missing required attribute '{0}'")]
    MissingAttribute(String),

    #[error("Invalid attribute '{name}': {message}")]
    InvalidAttribute { name: String, message: String },

    #[error(transparent)]
    Schema(#[from] TypeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OciError {
    pub fn invalid_attribute(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            OciError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Throttling, server side failures and transport errors
    pub fn is_retryable(&self) -> bool {
        match self {
            OciError::Transport(_) => true,
            OciError::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<WaitError<OciError>> for OciError {
    fn from(err: WaitError<OciError>) -> Self {
        match err {
            // A failed refresh surfaces as the underlying API error
            WaitError::Refresh(inner) => inner,
            other => OciError::Wait(Box::new(other)),
        }
    }
}

impl From<OciError> for ProviderError {
    fn from(err: OciError) -> Self {
        ProviderError::new(err.to_string()).with_cause(err)
    }
}

/// Result type of the OCI provider
pub type OciResult<T> = Result<T, OciError>;
