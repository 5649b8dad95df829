//! Error types for the Switchcloud reconciliation system.
//!
//! Errors are grouped by the layer that raises them: manifest loading,
//! state management, and reconciliation against the remote API. Every
//! error can be rendered as a [`Diagnostic`] for the caller.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// The main error type for the Switchcloud reconciliation system.
#[derive(Debug, Error)]
pub enum SwitchcloudError {
    /// Manifest-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Reconciliation errors raised while talking to the remote API.
    #[error("{0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Manifest-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Duplicate resource key.
    #[error("Duplicate {resource_type} key: {key}")]
    DuplicateKey {
        /// Type of resource (project, member).
        resource_type: String,
        /// The duplicated key.
        key: String,
    },

    /// A resource address could not be parsed.
    #[error("Invalid resource address '{address}': expected project.<key> or project_member.<key>")]
    InvalidAddress {
        /// The rejected address.
        address: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },

    /// No resource is recorded at the given address.
    #[error("No resource recorded at {address}")]
    UnknownResource {
        /// The missing address.
        address: String,
    },
}

/// Errors raised by a reconciliation operation.
///
/// Each variant is terminal for the call that produced it.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The desired object violates a validation rule.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the violation.
        message: String,
        /// Attribute the violation is attached to.
        attribute: Option<String>,
    },

    /// An import identifier does not match the kind's identity format.
    #[error("Malformed import identifier '{id}': expected {expected}")]
    MalformedImportId {
        /// The rejected identifier.
        id: String,
        /// The expected format.
        expected: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode remote response: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// The remote API answered with an unexpected status.
    #[error("Remote API rejected the request with status {status}: {body}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The remote API has no capability for this operation.
    #[error("{operation} is not supported by the remote API for {type_name}")]
    Unsupported {
        /// Operation name.
        operation: String,
        /// Object type name.
        type_name: String,
    },

    /// A changed attribute can only be applied by destroy and recreate.
    #[error("Changing {} requires replacing the {type_name}", .attributes.join(", "))]
    ReplacementRequired {
        /// Object type name.
        type_name: String,
        /// Attributes whose change forces replacement.
        attributes: Vec<String>,
    },

    /// A lookup matched no remote object.
    #[error("No {type_name} found with {attribute} '{value}'")]
    NotFound {
        /// Object type name.
        type_name: String,
        /// Attribute used for the lookup.
        attribute: String,
        /// Value searched for.
        value: String,
    },
}

/// Result type alias for Switchcloud operations.
pub type Result<T> = std::result::Result<T, SwitchcloudError>;

/// Category of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Desired object failed validation.
    ConfigurationError,
    /// Import identifier could not be parsed.
    MalformedImportId,
    /// No response was received.
    TransportError,
    /// Response body was not understood.
    DecodeError,
    /// Remote API returned an unexpected status.
    RemoteRejected,
    /// Operation is not available for the kind.
    Unsupported,
    /// Change requires destroy and recreate.
    ReplacementRequired,
    /// Lookup found nothing.
    NotFound,
    /// Manifest, state, or internal failure outside reconciliation.
    Internal,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConfigurationError => "Configuration Error",
            Self::MalformedImportId => "Malformed Import ID",
            Self::TransportError => "Transport Error",
            Self::DecodeError => "Decode Error",
            Self::RemoteRejected => "Remote Rejected",
            Self::Unsupported => "Unsupported",
            Self::ReplacementRequired => "Replacement Required",
            Self::NotFound => "Not Found",
            Self::Internal => "Error",
        };
        write!(f, "{name}")
    }
}

/// A user-facing report of a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Error category.
    pub kind: DiagnosticKind,
    /// Short summary.
    pub summary: String,
    /// Full detail.
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

impl SwitchcloudError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if repeating the same call may succeed.
    ///
    /// The crate never retries on its own; this is a hint for callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Reconcile(ReconcileError::Transport { .. })
                | Self::State(StateError::LockFailed { .. })
        )
    }

    /// Returns the diagnostic kind of this error.
    #[must_use]
    pub const fn kind(&self) -> DiagnosticKind {
        match self {
            Self::Reconcile(err) => err.kind(),
            Self::Config(_) | Self::State(_) | Self::Io(_) | Self::Internal(_) => {
                DiagnosticKind::Internal
            }
        }
    }

    /// Renders the error as a diagnostic.
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic {
            kind: self.kind(),
            summary: self.kind().to_string(),
            detail: self.to_string(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl ReconcileError {
    /// Creates a configuration error attached to an attribute.
    #[must_use]
    pub fn configuration(message: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            attribute: Some(attribute.into()),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates the transport error reported when a call is cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::transport("operation cancelled before the remote API responded")
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a remote rejection from a status and raw body.
    #[must_use]
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            body: body.into(),
        }
    }

    /// Creates an unsupported-operation error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            type_name: type_name.into(),
        }
    }

    /// Returns the diagnostic kind of this error.
    #[must_use]
    pub const fn kind(&self) -> DiagnosticKind {
        match self {
            Self::Configuration { .. } => DiagnosticKind::ConfigurationError,
            Self::MalformedImportId { .. } => DiagnosticKind::MalformedImportId,
            Self::Transport { .. } => DiagnosticKind::TransportError,
            Self::Decode { .. } => DiagnosticKind::DecodeError,
            Self::RemoteRejected { .. } => DiagnosticKind::RemoteRejected,
            Self::Unsupported { .. } => DiagnosticKind::Unsupported,
            Self::ReplacementRequired { .. } => DiagnosticKind::ReplacementRequired,
            Self::NotFound { .. } => DiagnosticKind::NotFound,
        }
    }
}
