//! Issuance engine.
//!
//! Drives one identity through `KeyPending → KeyReady → CsrReady → Issued`.
//! New issuance starts at `KeyPending`; renewal starts at `CsrReady` and
//! reuses the stored key, CSR and SAN record. All output is staged and only
//! promoted once signing succeeded.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CaPassphrase, Configuration};
use crate::engine::{CryptoEngine, SigningRequest, Subject};
use crate::error::{Error, IssuanceStep, Result};
use crate::identity::{CertificateIdentity, RecordSubject, render_san_record};
use crate::store::{ArtifactKind, ArtifactPaths, ArtifactStore, Staging};

/// State of one identity in the issuance state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceState {
    /// No key yet.
    KeyPending,
    /// Key generated, CSR pending.
    KeyReady,
    /// CSR and SAN record available, signature pending.
    CsrReady,
    /// Certificate signed and promoted.
    Issued,
    /// A step failed; nothing was promoted.
    Failed(IssuanceStep),
}

impl IssuanceState {
    /// Whether no further step follows.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Issued | Self::Failed(_))
    }
}

impl std::fmt::Display for IssuanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyPending => f.write_str("key-pending"),
            Self::KeyReady => f.write_str("key-ready"),
            Self::CsrReady => f.write_str("csr-ready"),
            Self::Issued => f.write_str("issued"),
            Self::Failed(step) => write!(f, "failed({step})"),
        }
    }
}

/// How a certificate came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuanceMode {
    /// Fresh key, CSR, SAN record and certificate.
    Issued,
    /// Existing CSR re-signed.
    Renewed,
}

/// Result of a successful issuance or renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuanceOutcome {
    /// Common name of the certificate.
    pub common_name: String,
    /// SAN entries in record order.
    pub sans: Vec<String>,
    /// Whether this was a new issuance or a renewal.
    pub mode: IssuanceMode,
    /// Final artifact paths.
    pub paths: ArtifactPaths,
}

/// Runs the issuance state machine against a crypto engine.
pub struct Issuer<'a, E: ?Sized> {
    config: &'a Configuration,
    store: &'a ArtifactStore,
    engine: &'a E,
    passphrase: &'a CaPassphrase,
}

impl<'a, E: CryptoEngine + ?Sized> Issuer<'a, E> {
    /// Creates an issuer.
    #[must_use]
    pub const fn new(
        config: &'a Configuration,
        store: &'a ArtifactStore,
        engine: &'a E,
        passphrase: &'a CaPassphrase,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            passphrase,
        }
    }

    /// Issues a new artifact set, replacing any existing one for the CN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Issuance`] naming the failing step, or
    /// [`Error::Storage`] if the output directory is unusable.
    pub fn issue(&self, identity: &CertificateIdentity) -> Result<IssuanceOutcome> {
        self.store.ensure_root()?;

        let existing = self.store.layout_for(identity);
        if ArtifactKind::ALL
            .iter()
            .any(|&kind| self.store.exists(&existing, kind))
        {
            warn!(
                "Replacing existing artifacts for {}",
                identity.common_name()
            );
        }

        info!("Issuing certificate for {identity}");
        let staging = self.store.stage(identity)?;
        let sources = staging.paths().clone();
        self.drive(identity, &staging, &sources, IssuanceState::KeyPending)?;

        let paths = staging.promote(&ArtifactKind::ALL).map_err(|e| {
            fail(identity, IssuanceStep::Promote, e.to_string())
        })?;
        info!("Certificate issued for {}: {}", identity.common_name(), paths.cert_path.display());

        Ok(IssuanceOutcome {
            common_name: identity.common_name().to_string(),
            sans: identity.sans().to_vec(),
            mode: IssuanceMode::Issued,
            paths,
        })
    }

    /// Re-signs the stored CSR, replacing only the certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] if the key, CSR or SAN record is
    /// absent, otherwise as [`Issuer::issue`].
    pub fn renew(&self, identity: &CertificateIdentity) -> Result<IssuanceOutcome> {
        let sources = self.store.layout_for(identity);
        for kind in [ArtifactKind::Key, ArtifactKind::Csr, ArtifactKind::SanRecord] {
            if !self.store.exists(&sources, kind) {
                return Err(Error::MissingArtifact {
                    common_name: identity.common_name().to_string(),
                    kind,
                    path: sources.get(kind).to_path_buf(),
                });
            }
        }

        info!("Renewing certificate for {identity}");
        let staging = self.store.stage(identity)?;
        self.drive(identity, &staging, &sources, IssuanceState::CsrReady)?;

        let paths = staging
            .promote(&[ArtifactKind::Certificate])
            .map_err(|e| fail(identity, IssuanceStep::Promote, e.to_string()))?;
        info!("Certificate renewed for {}: {}", identity.common_name(), paths.cert_path.display());

        Ok(IssuanceOutcome {
            common_name: identity.common_name().to_string(),
            sans: identity.sans().to_vec(),
            mode: IssuanceMode::Renewed,
            paths,
        })
    }

    /// Steps the state machine from `start` until the certificate is staged.
    ///
    /// `sources` is where the key, CSR and SAN record are read from: the
    /// staging area for new issuance, the final layout for renewal.
    fn drive(
        &self,
        identity: &CertificateIdentity,
        staging: &Staging,
        sources: &ArtifactPaths,
        start: IssuanceState,
    ) -> Result<()> {
        let cn = identity.common_name();
        let mut state = start;

        while !state.is_terminal() {
            let next = match self.advance(identity, staging, sources, state) {
                Ok(next) => next,
                Err(err) => {
                    if let Some(step) = err.failed_step() {
                        warn!(
                            "{cn}: {state} -> {} (engine: {})",
                            IssuanceState::Failed(step),
                            self.engine.name()
                        );
                    }
                    return Err(err);
                }
            };

            debug!("{cn}: {state} -> {next} (engine: {})", self.engine.name());
            state = next;
        }
        Ok(())
    }

    /// Performs the work of one state and returns the following state.
    /// Terminal states map to themselves.
    fn advance(
        &self,
        identity: &CertificateIdentity,
        staging: &Staging,
        sources: &ArtifactPaths,
        state: IssuanceState,
    ) -> Result<IssuanceState> {
        match state {
            IssuanceState::KeyPending => {
                let key = self
                    .engine
                    .generate_key(self.config.key_bits, None)
                    .map_err(|e| Error::issuance(identity.common_name(), IssuanceStep::GenerateKey, &e))?;
                stage_artifact(identity, staging, ArtifactKind::Key, IssuanceStep::GenerateKey, &key)?;
                Ok(IssuanceState::KeyReady)
            }
            IssuanceState::KeyReady => {
                let record = render_san_record(
                    identity,
                    &RecordSubject {
                        country: &self.config.country,
                        organization: &self.config.organization,
                        key_bits: self.config.key_bits,
                    },
                );
                stage_artifact(identity, staging, ArtifactKind::SanRecord, IssuanceStep::WriteSanRecord, &record)?;

                let subject = Subject {
                    common_name: identity.common_name(),
                    organization: &self.config.organization,
                    country: &self.config.country,
                };
                let csr = self
                    .engine
                    .generate_csr(&sources.key_path, &subject, &sources.san_path)
                    .map_err(|e| Error::issuance(identity.common_name(), IssuanceStep::GenerateCsr, &e))?;
                stage_artifact(identity, staging, ArtifactKind::Csr, IssuanceStep::GenerateCsr, &csr)?;
                Ok(IssuanceState::CsrReady)
            }
            IssuanceState::CsrReady => {
                self.check_ca_material(identity)?;
                let request = SigningRequest {
                    csr: &sources.csr_path,
                    san_record: &sources.san_path,
                    ca_key: &self.config.ca_key,
                    ca_cert: &self.config.ca_cert,
                    ca_passphrase: self.passphrase.expose(),
                    validity_days: self.config.validity_days,
                };
                let cert = self
                    .engine
                    .sign_csr(&request)
                    .map_err(|e| Error::issuance(identity.common_name(), IssuanceStep::Sign, &e))?;
                stage_artifact(identity, staging, ArtifactKind::Certificate, IssuanceStep::Sign, &cert)?;
                Ok(IssuanceState::Issued)
            }
            IssuanceState::Issued | IssuanceState::Failed(_) => Ok(state),
        }
    }

    fn check_ca_material(&self, identity: &CertificateIdentity) -> Result<()> {
        if !self.config.ca_key.is_file() {
            return Err(fail(
                identity,
                IssuanceStep::Sign,
                format!("CA key not found: {}", self.config.ca_key.display()),
            ));
        }
        if !self.config.ca_cert.is_file() {
            return Err(fail(
                identity,
                IssuanceStep::Sign,
                format!("CA certificate not found: {}", self.config.ca_cert.display()),
            ));
        }
        Ok(())
    }
}

fn stage_artifact(
    identity: &CertificateIdentity,
    staging: &Staging,
    kind: ArtifactKind,
    step: IssuanceStep,
    contents: &str,
) -> Result<()> {
    staging
        .write(kind, contents)
        .map_err(|e| fail(identity, step, e.to_string()))
}

fn fail(identity: &CertificateIdentity, step: IssuanceStep, reason: String) -> Error {
    Error::Issuance {
        common_name: identity.common_name().to_string(),
        step,
        reason,
    }
}

impl<E: ?Sized> std::fmt::Debug for Issuer<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("output_dir", &self.store.root())
            .field("passphrase", self.passphrase)
            .finish_non_exhaustive()
    }
}
