//! Crypto engine seam.
//!
//! The lifecycle core never performs cryptography itself. It asks a
//! [`CryptoEngine`] for three operations and stores whatever PEM text comes
//! back. [`OpensslEngine`] shells out to the `openssl` binary;
//! [`NativeEngine`] does the same work in-process.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

mod native;
mod openssl;

pub use native::NativeEngine;
pub use openssl::OpensslEngine;

/// Failure reported by a crypto engine operation.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The operation ran and reported failure.
    #[error("{diagnostic}")]
    Failed {
        /// Exit status of the external tool, if any.
        status: Option<i32>,
        /// Diagnostic text.
        diagnostic: String,
    },

    /// The operation exceeded its time budget and was aborted.
    #[error("timeout after {}s", after.as_secs_f64())]
    Timeout {
        /// The budget that was exceeded.
        after: Duration,
    },

    /// The engine could not be started at all.
    #[error("failed to start engine: {0}")]
    Spawn(String),

    /// The engine does not support the requested input.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl EngineError {
    /// Builds a [`EngineError::Failed`] without an exit status.
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self::Failed {
            status: None,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Result of a crypto engine operation.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Subject fields placed in a CSR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject<'a> {
    /// Common name (`CN`).
    pub common_name: &'a str,
    /// Organization (`O`).
    pub organization: &'a str,
    /// Country (`C`).
    pub country: &'a str,
}

/// Inputs for signing a CSR with the CA.
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    /// CSR to sign.
    pub csr: &'a Path,
    /// SAN configuration record supplying the `v3_req` extensions.
    pub san_record: &'a Path,
    /// CA private key.
    pub ca_key: &'a Path,
    /// CA certificate.
    pub ca_cert: &'a Path,
    /// Passphrase for the CA key, if it is encrypted.
    pub ca_passphrase: Option<&'a str>,
    /// Validity period of the issued certificate.
    pub validity_days: u32,
}

/// The three operations the lifecycle core needs from a crypto engine.
///
/// Every method is synchronous and returns PEM text on success.
pub trait CryptoEngine {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Generates an RSA private key, encrypted when a passphrase is given.
    fn generate_key(&self, bits: u32, passphrase: Option<&str>) -> EngineResult<String>;

    /// Generates a CSR for the key at `key` using the subject and the SAN
    /// configuration record at `san_record`.
    fn generate_csr(&self, key: &Path, subject: &Subject<'_>, san_record: &Path)
    -> EngineResult<String>;

    /// Signs a CSR with the CA, returning the certificate.
    fn sign_csr(&self, request: &SigningRequest<'_>) -> EngineResult<String>;
}

impl<E: CryptoEngine + ?Sized> CryptoEngine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn generate_key(&self, bits: u32, passphrase: Option<&str>) -> EngineResult<String> {
        (**self).generate_key(bits, passphrase)
    }

    fn generate_csr(
        &self,
        key: &Path,
        subject: &Subject<'_>,
        san_record: &Path,
    ) -> EngineResult<String> {
        (**self).generate_csr(key, subject, san_record)
    }

    fn sign_csr(&self, request: &SigningRequest<'_>) -> EngineResult<String> {
        (**self).sign_csr(request)
    }
}
