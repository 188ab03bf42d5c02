//! Certificate identity and its persisted SAN configuration record.
//!
//! A [`CertificateIdentity`] is the canonical CN + SAN pair every artifact
//! path and CSR subject is derived from. The SAN configuration record is the
//! persisted form of that identity: an engine configuration file whose
//! `[ alt_names ]` section lists each SAN as `DNS.<n> = <name>`, 1-indexed.
//! Renewal reads the record back instead of asking for the SANs again.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// File extension of SAN configuration records.
pub const SAN_RECORD_EXTENSION: &str = "san";

const ALT_NAMES_SECTION: &str = "alt_names";

/// Canonical identity of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateIdentity {
    common_name: String,
    sans: Vec<String>,
}

impl CertificateIdentity {
    /// Canonicalizes a common name and raw SAN entries.
    ///
    /// Entries are trimmed, empty ones dropped, and duplicates removed
    /// keeping the first occurrence. When nothing remains the SAN list
    /// defaults to `[common_name]`. The common name is not injected into an
    /// explicit SAN list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] when the common name is blank,
    /// cannot be used as a file name, or any entry contains characters that
    /// would corrupt the SAN record.
    pub fn canonicalize<I, S>(common_name: &str, raw_sans: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let common_name = common_name.trim();
        if common_name.is_empty() {
            return Err(Error::InvalidIdentity("common name cannot be empty".into()));
        }
        validate_common_name(common_name)?;

        let mut seen = HashSet::new();
        let mut sans = Vec::new();
        for raw in raw_sans {
            let san = raw.as_ref().trim();
            if san.is_empty() {
                continue;
            }
            validate_entry("subject alternative name", san)?;
            if seen.insert(san.to_string()) {
                sans.push(san.to_string());
            }
        }

        if sans.is_empty() {
            sans.push(common_name.to_string());
        }

        Ok(Self {
            common_name: common_name.to_string(),
            sans,
        })
    }

    /// Canonicalizes a comma-separated SAN list as given on the command line.
    ///
    /// # Errors
    ///
    /// See [`CertificateIdentity::canonicalize`].
    pub fn from_san_list(common_name: &str, san_list: Option<&str>) -> Result<Self> {
        Self::canonicalize(common_name, san_list.unwrap_or_default().split(','))
    }

    /// Rebuilds an identity from a persisted SAN configuration record.
    ///
    /// The common name comes from the file stem (`<CN>.san`), the SANs from
    /// the `DNS.<n>` entries in ascending index order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the file name does not follow
    /// the record convention or the file has no usable SAN extension block,
    /// and [`Error::Storage`] if it cannot be read.
    pub fn reconstruct_from_san_record(path: &Path) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedRecord {
            path: path.to_path_buf(),
            reason,
        };

        if path.extension().and_then(|e| e.to_str()) != Some(SAN_RECORD_EXTENSION) {
            return Err(malformed("not a .san record".into()));
        }
        let common_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| malformed("file name is not valid UTF-8".into()))?;

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("failed to read {}: {e}", path.display())))?;

        let sans = parse_alt_names(&content).map_err(malformed)?;

        Self::canonicalize(common_name, &sans).map_err(|e| malformed(e.to_string()))
    }

    /// Returns the common name.
    #[must_use]
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Returns the SAN entries in record order.
    #[must_use]
    pub fn sans(&self) -> &[String] {
        &self.sans
    }
}

impl std::fmt::Display for CertificateIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.common_name, self.sans.join(", "))
    }
}

/// Subject fields and key size used to render a SAN record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSubject<'a> {
    /// Country (`C`).
    pub country: &'a str,
    /// Organization (`O`).
    pub organization: &'a str,
    /// RSA modulus size recorded as `default_bits`.
    pub key_bits: u32,
}

/// Renders the SAN configuration record for an identity.
///
/// The output is a complete engine configuration usable both for CSR
/// generation (`[ req ]`) and as the signing extension file (`v3_req`).
#[must_use]
pub fn render_san_record(identity: &CertificateIdentity, subject: &RecordSubject<'_>) -> String {
    let mut record = format!(
        "[ req ]
default_bits        = {bits}
prompt              = no
distinguished_name  = req_distinguished_name
req_extensions      = v3_req
x509_extensions     = v3_req

[ req_distinguished_name ]
C  = {country}
O  = {organization}
CN = {cn}

[ v3_req ]
keyUsage = critical, digitalSignature, keyEncipherment
extendedKeyUsage = serverAuth
subjectAltName = @alt_names

[ {ALT_NAMES_SECTION} ]
",
        bits = subject.key_bits,
        country = subject.country,
        organization = subject.organization,
        cn = identity.common_name(),
    );

    for (idx, san) in identity.sans().iter().enumerate() {
        record.push_str(&format!("DNS.{} = {san}\n", idx + 1));
    }

    record
}

/// Extracts the DNS entries of the `[ alt_names ]` section in index order.
///
/// Returns a description of the problem when the section is missing, empty,
/// or contains anything other than uniquely indexed `DNS.<n>` entries.
pub fn parse_alt_names(content: &str) -> std::result::Result<Vec<String>, String> {
    let mut in_section = false;
    let mut found_section = false;
    let mut entries: Vec<(u32, String)> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = header.trim() == ALT_NAMES_SECTION;
            found_section |= in_section;
            continue;
        }
        if !in_section {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {}: expected 'DNS.<n> = <name>'", line_no + 1))?;
        let index = key
            .trim()
            .strip_prefix("DNS.")
            .ok_or_else(|| format!("line {}: unsupported entry '{}'", line_no + 1, key.trim()))?;
        let index: u32 = index
            .parse()
            .map_err(|_| format!("line {}: invalid DNS index '{index}'", line_no + 1))?;
        if index == 0 {
            return Err(format!("line {}: DNS indices start at 1", line_no + 1));
        }
        if entries.iter().any(|(i, _)| *i == index) {
            return Err(format!("line {}: duplicate DNS.{index}", line_no + 1));
        }

        let value = value.trim();
        if value.is_empty() {
            return Err(format!("line {}: DNS.{index} has no value", line_no + 1));
        }
        entries.push((index, value.to_string()));
    }

    if !found_section {
        return Err(format!("no [ {ALT_NAMES_SECTION} ] section"));
    }
    if entries.is_empty() {
        return Err(format!("[ {ALT_NAMES_SECTION} ] lists no DNS entries"));
    }

    entries.sort_by_key(|(index, _)| *index);
    Ok(entries.into_iter().map(|(_, value)| value).collect())
}

fn validate_common_name(common_name: &str) -> Result<()> {
    if common_name.starts_with('.') {
        return Err(Error::InvalidIdentity(format!(
            "common name '{common_name}' must not start with '.'"
        )));
    }
    if common_name.contains(['/', '\\']) {
        return Err(Error::InvalidIdentity(format!(
            "common name '{common_name}' must not contain path separators"
        )));
    }
    validate_entry("common name", common_name)
}

fn validate_entry(what: &str, value: &str) -> Result<()> {
    if let Some(bad) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | ',' | '#' | '$'))
    {
        return Err(Error::InvalidIdentity(format!(
            "{what} '{}' contains invalid character {bad:?}",
            value.escape_debug()
        )));
    }
    Ok(())
}
