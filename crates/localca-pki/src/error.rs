//! Certificate lifecycle error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::store::ArtifactKind;

/// Result type for certificate lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A step of the issuance state machine that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssuanceStep {
    /// Private key generation.
    GenerateKey,
    /// Writing the SAN configuration record.
    WriteSanRecord,
    /// CSR generation.
    GenerateCsr,
    /// Signing the CSR with the CA.
    Sign,
    /// Promoting staged artifacts to their final paths.
    Promote,
}

impl IssuanceStep {
    /// Returns the step name used in diagnostics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateKey => "generate-key",
            Self::WriteSanRecord => "write-san-record",
            Self::GenerateCsr => "generate-csr",
            Self::Sign => "sign",
            Self::Promote => "promote",
        }
    }
}

impl std::fmt::Display for IssuanceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificate lifecycle error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Common name or SAN input is unusable.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// A SAN configuration record could not be parsed.
    #[error("malformed SAN record {}: {reason}", path.display())]
    MalformedRecord {
        /// Path of the offending record.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Renewal was requested for an identity lacking a required artifact.
    #[error("missing {kind} for '{common_name}': {}", path.display())]
    MissingArtifact {
        /// Common name of the identity.
        common_name: String,
        /// Which artifact is missing.
        kind: ArtifactKind,
        /// Where it was expected.
        path: PathBuf,
    },

    /// A step delegated to the crypto engine failed.
    #[error("issuance of '{common_name}' failed at step {step}: {reason}")]
    Issuance {
        /// Common name of the identity.
        common_name: String,
        /// The failing step.
        step: IssuanceStep,
        /// Diagnostic text, usually from the crypto engine.
        reason: String,
    },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The invocation did not ask for anything meaningful.
    #[error("usage error: {0}")]
    Usage(String),

    /// Filesystem failure in the artifact store.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Builds an [`Error::Issuance`] from an engine failure.
    pub(crate) fn issuance(common_name: &str, step: IssuanceStep, err: &EngineError) -> Self {
        Self::Issuance {
            common_name: common_name.to_string(),
            step,
            reason: err.to_string(),
        }
    }

    /// The issuance step this error stopped at, if any.
    #[must_use]
    pub const fn failed_step(&self) -> Option<IssuanceStep> {
        match self {
            Self::Issuance { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Whether this error is a usage error (maps to exit status 2).
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}
