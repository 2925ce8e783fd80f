use configtx_credentials::CredentialError;
use thiserror::Error;

use crate::payload::CodecError;

/// The class of a [`ConfigTxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A named value, policy, group or member does not exist.
    NotFound,
    /// Stored content could not be decoded.
    Malformed,
    /// The caller supplied an unacceptable argument.
    InvalidArgument,
    /// The change would break the chain of trust of a membership.
    IntegrityViolation,
}

/// Errors raised while reading or mutating a channel configuration.
///
/// A failing operation leaves the configuration exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigTxError {
    /// A named entry is absent.
    #[error("{0}")]
    NotFound(String),

    /// The capability to remove is not in the capability set.
    #[error("capability not set")]
    CapabilityNotSet,

    /// Stored content could not be decoded.
    #[error("{context}: {source}")]
    Malformed {
        /// What was being done when decoding failed.
        context: String,
        /// The underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// The caller supplied an unacceptable argument.
    #[error("{0}")]
    InvalidArgument(String),

    /// The change would leave a certificate without a trusted root.
    #[error(transparent)]
    IntegrityViolation(CredentialError),

    /// A failure inside a named part of the configuration.
    #[error("{context}: {source}")]
    Context {
        /// The part that was being handled.
        context: String,
        /// The underlying failure.
        #[source]
        source: Box<ConfigTxError>,
    },
}

impl ConfigTxError {
    /// The class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigTxError::NotFound(_) | ConfigTxError::CapabilityNotSet => ErrorKind::NotFound,
            ConfigTxError::Malformed { .. } => ErrorKind::Malformed,
            ConfigTxError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ConfigTxError::IntegrityViolation(_) => ErrorKind::IntegrityViolation,
            ConfigTxError::Context { source, .. } => source.kind(),
        }
    }

    pub(crate) fn context(self, context: impl Into<String>) -> Self {
        ConfigTxError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn missing_value(key: &str) -> Self {
        ConfigTxError::NotFound(format!("config does not contain value for {key}"))
    }

    pub(crate) fn malformed(context: impl Into<String>, source: impl Into<CodecError>) -> Self {
        ConfigTxError::Malformed {
            context: context.into(),
            source: source.into(),
        }
    }
}
