//! Error types for the adapter.
//!
//! None of these ever cross the C boundary. Trampolines collapse them into
//! the host's failure values (null handle, `false`, `0`) after logging.

use thiserror::Error;

/// Result alias used by plugin implementations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Failure reported by a typed plugin operation.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The host passed something unusable (bad path, malformed string).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File or device access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file was readable but its contents could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Stale, unknown, or mistyped handle token.
    #[error("Handle error: {0}")]
    Handle(#[from] RegistryError),

    /// The operation is not part of the plugin's capability composition.
    #[error("Operation not supported: {operation}")]
    CapabilityMismatch {
        /// Name of the refused operation.
        operation: &'static str,
    },

    /// The plugin produced more data than the host's buffer was declared to hold.
    #[error("Plugin produced {produced} bytes for a {capacity}-byte buffer")]
    FormatOverflow {
        /// Bytes the plugin returned.
        produced: usize,
        /// Bytes the current format descriptor allows.
        capacity: usize,
    },

    /// Unmanaged memory for a descriptor or buffer could not be reserved.
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// Anything else a plugin wants to report.
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of [`PluginError`], used for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad host input.
    Input,
    /// Filesystem failure.
    Io,
    /// Undecodable media.
    Decode,
    /// Handle lookup failure.
    Handle,
    /// Unsupported operation.
    Capability,
    /// Oversized read result.
    Overflow,
    /// Out of memory.
    Allocation,
    /// Uncategorised.
    Other,
}

impl PluginError {
    /// Wraps any displayable error as [`PluginError::Other`].
    pub fn other(error: impl std::fmt::Display) -> Self {
        Self::Other(error.to_string())
    }

    /// Wraps a decoder error as [`PluginError::Decode`].
    pub fn decode(error: impl std::fmt::Display) -> Self {
        Self::Decode(error.to_string())
    }

    /// Coarse category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) => ErrorCategory::Input,
            Self::Io(_) => ErrorCategory::Io,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Handle(_) => ErrorCategory::Handle,
            Self::CapabilityMismatch { .. } => ErrorCategory::Capability,
            Self::FormatOverflow { .. } => ErrorCategory::Overflow,
            Self::Allocation(_) => ErrorCategory::Allocation,
            Self::Other(_) => ErrorCategory::Other,
        }
    }
}

impl ErrorCategory {
    /// Stable lowercase name for structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Io => "io",
            Self::Decode => "decode",
            Self::Handle => "handle",
            Self::Capability => "capability",
            Self::Overflow => "overflow",
            Self::Allocation => "allocation",
            Self::Other => "other",
        }
    }
}

/// Handle registry lookup failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Token was never issued by this registry or has been retired.
    #[error("Handle {0:#x} is not registered")]
    NotFound(usize),

    /// Token is live but holds a different handle type.
    #[error("Handle {token:#x} does not hold a {expected}")]
    KindMismatch {
        /// Token that was looked up.
        token: usize,
        /// Type name the caller asked for.
        expected: &'static str,
    },
}

impl RegistryError {
    /// Token the failed lookup was made with.
    #[must_use]
    pub fn token(&self) -> usize {
        match self {
            Self::NotFound(token) | Self::KindMismatch { token, .. } => *token,
        }
    }

    /// Short reason for structured logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "stale_or_foreign_token",
            Self::KindMismatch { .. } => "handle_kind_mismatch",
        }
    }
}

/// Table construction failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Input composition provides neither video nor audio.
    #[error("Input table declares neither video nor audio")]
    NoMediaKind,

    /// Output composition consumes neither video nor audio.
    #[error("Output table declares neither video nor audio")]
    NoOutputMedia,

    /// A metadata string cannot be encoded for the host.
    #[error("Invalid {field} string: {reason}")]
    InvalidString {
        /// Which metadata field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Memory for the table or one of its strings could not be reserved.
    #[error("Allocation failed for {field}")]
    Allocation {
        /// What was being allocated.
        field: &'static str,
    },
}

impl From<BuildError> for PluginError {
    fn from(error: BuildError) -> Self {
        match error {
            BuildError::Allocation { field } => Self::Allocation(field.to_string()),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}
