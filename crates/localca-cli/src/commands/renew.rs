//! Renew command implementation.

use std::io::Write;

use localca_pki::{CaPassphrase, Configuration, CryptoEngine, Orchestrator};

use crate::error::CliError;
use crate::output::OutputFormat;

/// Re-signs every stored CSR with its recorded SANs.
pub struct RenewCommand<'a, E: ?Sized> {
    orchestrator: Orchestrator<'a, E>,
}

impl<'a, E: CryptoEngine + ?Sized> RenewCommand<'a, E> {
    /// Create a new renew command.
    #[must_use]
    pub const fn new(config: &'a Configuration, engine: &'a E, passphrase: &'a CaPassphrase) -> Self {
        Self {
            orchestrator: Orchestrator::new(config, engine, passphrase),
        }
    }

    /// Execute the renew command.
    ///
    /// The summary is written even when some records fail.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Incomplete`] if any record failed, or an error
    /// if the configuration is invalid or output fails.
    pub fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let summary = self.orchestrator.renew_all()?.summary();
        format.write(writer, &summary)?;

        if summary.failed > 0 {
            return Err(CliError::Incomplete {
                failed: summary.failed,
                total: summary.entries.len(),
            });
        }
        Ok(())
    }
}
