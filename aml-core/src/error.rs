//! Error types for the Agent Memory & Learning core.
//!
//! A single flat enum covers every failure mode across the crate (storage,
//! access control, learning, backup). Each variant carries enough context
//! to audit the failure without the caller having to downcast.

use uuid::Uuid;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for the memory and learning engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create operation targeted an id that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(Uuid),

    /// An entity failed schema validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The principal lacks permission for the requested operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A write would take the store past its configured size cap.
    #[error("size exceeded: {0}")]
    SizeExceeded(String),

    /// A stored record failed its checksum or AEAD tag check.
    #[error("corrupted record: {0}")]
    Corrupted(String),

    /// AEAD decryption failed (wrong key or tampered ciphertext).
    #[error("decryption failed: {0}")]
    DecryptFailure(String),

    /// Underlying filesystem I/O failed.
    #[error("io failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// The caller's deadline elapsed before the operation completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A candidate pattern did not clear the statistical significance bar.
    #[error("insufficient evidence: {0}")]
    InsufficientEvidence(String),

    /// Cross-agent adaptation would rewrite the approach's technique and
    /// architectural changes are disallowed.
    #[error("adaptation refused: {0}")]
    AdaptationRefused(String),

    /// A weighted vote did not reach quorum.
    #[error("no quorum: {0}")]
    NoQuorum(String),

    /// The named backup does not exist.
    #[error("backup not found: {0}")]
    BackupNotFound(String),

    /// A restore was refused because the live tree has unsaved changes and
    /// no pre-restore backup was requested.
    #[error("restore conflict: {0}")]
    RestoreConflict(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration failed validation; details are in `ConfigError`.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Catch-all for invariants that should be unreachable in practice.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable kind tag, used for audit records and client-facing `Result`s.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::Validation(_) => "Validation",
            Self::AccessDenied(_) => "AccessDenied",
            Self::SizeExceeded(_) => "SizeExceeded",
            Self::Corrupted(_) => "Corrupted",
            Self::DecryptFailure(_) => "DecryptFailure",
            Self::IoFailure(_) => "IOFailure",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::InsufficientEvidence(_) => "InsufficientEvidence",
            Self::AdaptationRefused(_) => "AdaptationRefused",
            Self::NoQuorum(_) => "NoQuorum",
            Self::BackupNotFound(_) => "BackupNotFound",
            Self::RestoreConflict(_) => "RestoreConflict",
            Self::Serialization(_) => "Validation",
            Self::Configuration(_) => "Validation",
            Self::Internal(_) => "Internal",
        }
    }

    /// Whether a single automatic retry is worth attempting under the
    /// crate's propagation policy: IO and corruption are retried once,
    /// nothing else is.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IoFailure(_) | Self::Corrupted(_))
    }
}

/// Structured error payload returned to facade callers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetails {
    /// Stable error kind tag (e.g. `"NotFound"`).
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Optional machine-readable extra context.
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for ErrorDetails {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_corrupted_are_recoverable() {
        let io = Error::IoFailure(std::io::Error::other("disk full"));
        assert!(io.is_recoverable());
        let corrupt = Error::Corrupted("bad checksum".into());
        assert!(corrupt.is_recoverable());
    }

    #[test]
    fn validation_and_access_are_not_recoverable() {
        assert!(!Error::Validation("bad field".into()).is_recoverable());
        assert!(!Error::AccessDenied("nope".into()).is_recoverable());
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(Error::NotFound("x".into()).kind(), "NotFound");
        assert_eq!(Error::DeadlineExceeded.kind(), "DeadlineExceeded");
    }
}
