//! Issue command implementation.

use std::io::Write;

use localca_pki::{CaPassphrase, CertificateIdentity, Configuration, CryptoEngine, Orchestrator};

use crate::error::CliError;
use crate::output::OutputFormat;

/// Issues a key, CSR, SAN record and certificate for one identity.
pub struct IssueCommand<'a, E: ?Sized> {
    orchestrator: Orchestrator<'a, E>,
}

impl<'a, E: CryptoEngine + ?Sized> IssueCommand<'a, E> {
    /// Create a new issue command.
    #[must_use]
    pub const fn new(config: &'a Configuration, engine: &'a E, passphrase: &'a CaPassphrase) -> Self {
        Self {
            orchestrator: Orchestrator::new(config, engine, passphrase),
        }
    }

    /// Execute the issue command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, any issuance step
    /// fails, or output fails.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        identity: &CertificateIdentity,
    ) -> Result<(), CliError> {
        let outcome = self.orchestrator.issue(identity)?;
        format.write(writer, &outcome)
    }
}
