//! Entry point tying the components together for one invocation.

use tracing::{info, warn};

use crate::config::{CaPassphrase, Configuration};
use crate::engine::CryptoEngine;
use crate::error::{Error, Result};
use crate::identity::CertificateIdentity;
use crate::issuance::{IssuanceOutcome, Issuer};
use crate::renewal::{RenewalReport, RenewalScanner};
use crate::store::ArtifactStore;

/// Raw invocation intent, as parsed from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Common name for new issuance.
    pub common_name: Option<String>,
    /// Comma-separated SAN list for new issuance.
    pub subject_alternative_names: Option<String>,
    /// Renew every stored certificate instead.
    pub renew: bool,
}

/// What the run will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Issue one new artifact set.
    Issue(CertificateIdentity),
    /// Renew every stored certificate.
    Renew,
}

impl Mode {
    /// Interprets an invocation.
    ///
    /// Renew wins over issuance arguments, which are then ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] when neither a common name nor renew was
    /// requested, and [`Error::InvalidIdentity`] for unusable CN/SAN input.
    pub fn from_invocation(invocation: &Invocation) -> Result<Self> {
        if invocation.renew {
            if invocation.common_name.is_some() || invocation.subject_alternative_names.is_some() {
                warn!("--renew given: ignoring common name and SAN arguments");
            }
            return Ok(Self::Renew);
        }

        let common_name = invocation.common_name.as_deref().ok_or_else(|| {
            Error::Usage("either --common-name or --renew is required".into())
        })?;

        CertificateIdentity::from_san_list(
            common_name,
            invocation.subject_alternative_names.as_deref(),
        )
        .map(Self::Issue)
    }
}

/// Result of one run.
#[derive(Debug)]
pub enum RunOutcome {
    /// A single certificate was issued.
    Issued(IssuanceOutcome),
    /// A renew-all pass completed (possibly with per-record failures).
    Renewed(RenewalReport),
}

impl RunOutcome {
    /// Whether the run fully succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Issued(_) => true,
            Self::Renewed(report) => !report.has_failures(),
        }
    }
}

/// Sequences identity, storage, issuance and renewal for one run.
pub struct Orchestrator<'a, E: ?Sized> {
    config: &'a Configuration,
    engine: &'a E,
    passphrase: &'a CaPassphrase,
}

impl<'a, E: CryptoEngine + ?Sized> Orchestrator<'a, E> {
    /// Creates an orchestrator.
    #[must_use]
    pub const fn new(config: &'a Configuration, engine: &'a E, passphrase: &'a CaPassphrase) -> Self {
        Self {
            config,
            engine,
            passphrase,
        }
    }

    /// Validates the configuration and executes the mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid configuration and
    /// any error of a single issuance. Per-record renewal failures are
    /// carried in the [`RenewalReport`] instead.
    pub fn run(&self, mode: &Mode) -> Result<RunOutcome> {
        match mode {
            Mode::Issue(identity) => self.issue(identity).map(RunOutcome::Issued),
            Mode::Renew => self.renew_all().map(RunOutcome::Renewed),
        }
    }

    /// Validates the configuration and issues one artifact set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid configuration, or the
    /// issuance error.
    pub fn issue(&self, identity: &CertificateIdentity) -> Result<IssuanceOutcome> {
        self.config.validate()?;
        let store = ArtifactStore::new(&self.config.output_dir);
        info!("Using {} crypto engine", self.engine.name());
        Issuer::new(self.config, &store, self.engine, self.passphrase).issue(identity)
    }

    /// Validates the configuration and renews every stored certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid configuration, or
    /// [`Error::Storage`] if the output directory cannot be listed.
    pub fn renew_all(&self) -> Result<RenewalReport> {
        self.config.validate()?;
        let store = ArtifactStore::new(&self.config.output_dir);
        info!("Using {} crypto engine", self.engine.name());
        let issuer = Issuer::new(self.config, &store, self.engine, self.passphrase);
        RenewalScanner::new(&store, issuer).renew_all()
    }
}
