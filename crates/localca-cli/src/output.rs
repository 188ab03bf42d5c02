//! Output formatting for CLI results.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use localca_pki::{IssuanceMode, IssuanceOutcome, RenewalSummary};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for IssuanceOutcome {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match self.mode {
            IssuanceMode::Issued => writeln!(writer, "Certificate successfully created!")?,
            IssuanceMode::Renewed => writeln!(writer, "Certificate successfully renewed!")?,
        }
        writeln!(writer, "  Private Key File: {}", self.paths.key_path.display())?;
        writeln!(writer, "  CSR File        : {}", self.paths.csr_path.display())?;
        writeln!(writer, "  Certificate File: {}", self.paths.cert_path.display())?;
        writeln!(writer, "  SAN File        : {}", self.paths.san_path.display())?;
        writeln!(writer, "  SANs            : {}", self.sans.join(", "))?;
        Ok(())
    }
}

impl TableDisplay for RenewalSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.entries.is_empty() {
            writeln!(writer, "No certificates to renew")?;
            return Ok(());
        }

        writeln!(writer, "{:<32}  {:<8}  DETAIL", "COMMON NAME", "STATUS")?;
        writeln!(writer, "{}", "─".repeat(72))?;

        for entry in &self.entries {
            let name = entry.common_name.clone().unwrap_or_else(|| {
                entry
                    .record
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let detail = match (&entry.certificate, &entry.error) {
                (_, Some(error)) => error.clone(),
                (Some(cert), None) => cert.display().to_string(),
                (None, None) => String::new(),
            };
            writeln!(
                writer,
                "{:<32}  {:<8}  {}",
                truncate(&name, 32),
                entry.status,
                detail
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Renewed: {}, failed: {}", self.renewed, self.failed)?;
        Ok(())
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
