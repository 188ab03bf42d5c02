//! Batch renewal of every previously issued certificate.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::engine::CryptoEngine;
use crate::error::{Error, Result};
use crate::identity::CertificateIdentity;
use crate::issuance::{IssuanceOutcome, Issuer};
use crate::store::ArtifactStore;

/// Outcome of renewing one SAN record.
#[derive(Debug)]
pub enum RenewalEntry {
    /// The certificate was re-signed.
    Renewed(IssuanceOutcome),
    /// The record could not be renewed.
    Failed {
        /// The SAN record that was being processed.
        record: PathBuf,
        /// Common name, when the record got far enough to yield one.
        common_name: Option<String>,
        /// Why it failed.
        error: Error,
    },
}

impl RenewalEntry {
    /// Whether this entry failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-identity results of a renew-all run, in enumeration order.
#[derive(Debug, Default)]
pub struct RenewalReport {
    entries: Vec<RenewalEntry>,
}

impl RenewalReport {
    /// Returns every entry.
    #[must_use]
    pub fn entries(&self) -> &[RenewalEntry] {
        &self.entries
    }

    /// Number of renewed certificates.
    #[must_use]
    pub fn renewed_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_failed()).count()
    }

    /// Number of failed records.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failed()).count()
    }

    /// Whether any record failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(RenewalEntry::is_failed)
    }

    /// Returns a serializable summary.
    #[must_use]
    pub fn summary(&self) -> RenewalSummary {
        RenewalSummary {
            renewed: self.renewed_count(),
            failed: self.failed_count(),
            entries: self
                .entries
                .iter()
                .map(|entry| match entry {
                    RenewalEntry::Renewed(outcome) => RenewalSummaryEntry {
                        record: outcome.paths.san_path.clone(),
                        common_name: Some(outcome.common_name.clone()),
                        status: "renewed",
                        certificate: Some(outcome.paths.cert_path.clone()),
                        error: None,
                    },
                    RenewalEntry::Failed {
                        record,
                        common_name,
                        error,
                    } => RenewalSummaryEntry {
                        record: record.clone(),
                        common_name: common_name.clone(),
                        status: "failed",
                        certificate: None,
                        error: Some(error.to_string()),
                    },
                })
                .collect(),
        }
    }
}

/// Serializable view of a [`RenewalReport`].
#[derive(Debug, Clone, Serialize)]
pub struct RenewalSummary {
    /// Number of renewed certificates.
    pub renewed: usize,
    /// Number of failed records.
    pub failed: usize,
    /// One line per record.
    pub entries: Vec<RenewalSummaryEntry>,
}

/// One record in a [`RenewalSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct RenewalSummaryEntry {
    /// SAN record path.
    pub record: PathBuf,
    /// Common name, if known.
    pub common_name: Option<String>,
    /// `renewed` or `failed`.
    pub status: &'static str,
    /// Renewed certificate path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PathBuf>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Finds stored SAN records and re-signs their CSRs one at a time.
pub struct RenewalScanner<'a, E: ?Sized> {
    store: &'a ArtifactStore,
    issuer: Issuer<'a, E>,
}

impl<'a, E: CryptoEngine + ?Sized> RenewalScanner<'a, E> {
    /// Creates a scanner over the issuer's artifact store.
    #[must_use]
    pub const fn new(store: &'a ArtifactStore, issuer: Issuer<'a, E>) -> Self {
        Self { store, issuer }
    }

    /// Renews every identity that has a SAN record.
    ///
    /// A failing record is recorded in the report and the batch continues.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] only if the output directory itself
    /// cannot be listed.
    pub fn renew_all(&self) -> Result<RenewalReport> {
        info!("Looking for certificates to renew in {}", self.store.root().display());
        let records = self.store.list_san_records()?;

        let mut report = RenewalReport::default();
        for record in records {
            let entry = match self.renew_record(&record) {
                Ok(outcome) => RenewalEntry::Renewed(outcome),
                Err((common_name, error)) => {
                    warn!("Renewal failed for {}: {error}", record.display());
                    RenewalEntry::Failed {
                        record,
                        common_name,
                        error,
                    }
                }
            };
            report.entries.push(entry);
        }

        info!(
            "Renewal finished: {} renewed, {} failed",
            report.renewed_count(),
            report.failed_count()
        );
        Ok(report)
    }

    fn renew_record(
        &self,
        record: &std::path::Path,
    ) -> std::result::Result<IssuanceOutcome, (Option<String>, Error)> {
        let identity =
            CertificateIdentity::reconstruct_from_san_record(record).map_err(|e| (None, e))?;
        self.issuer
            .renew(&identity)
            .map_err(|e| (Some(identity.common_name().to_string()), e))
    }
}
