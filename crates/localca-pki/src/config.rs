//! Process-wide configuration, built once at startup.

use std::path::PathBuf;
use std::time::Duration;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Default validity period for signed certificates.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Default RSA modulus size for generated keys.
pub const DEFAULT_KEY_BITS: u32 = 2048;

/// Smallest RSA modulus accepted for generated keys.
pub const MIN_KEY_BITS: u32 = 2048;

/// Configuration shared by every component for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Path to the CA private key.
    pub ca_key: PathBuf,
    /// Path to the CA certificate.
    pub ca_cert: PathBuf,
    /// Root directory for generated artifacts.
    pub output_dir: PathBuf,
    /// Organization (`O`) for CSR subjects.
    pub organization: String,
    /// Country (`C`) for CSR subjects.
    pub country: String,
    /// Validity period in days for signed certificates.
    pub validity_days: u32,
    /// RSA modulus size for generated keys.
    pub key_bits: u32,
    /// Upper bound for a single crypto engine invocation.
    pub engine_timeout: Option<Duration>,
}

impl Configuration {
    /// Creates a configuration with the defaults of the original tool.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            ca_key: PathBuf::from("./ca.key"),
            ca_cert: PathBuf::from("./ca.crt"),
            output_dir: output_dir.into(),
            organization: "DefaultOrganization".into(),
            country: "US".into(),
            validity_days: DEFAULT_VALIDITY_DAYS,
            key_bits: DEFAULT_KEY_BITS,
            engine_timeout: None,
        }
    }

    /// Validates every field, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            return Err(Error::Configuration("ORGANIZATION cannot be empty".into()));
        }
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Configuration(format!(
                "COUNTRY must be a two-letter code, got '{}'",
                self.country
            )));
        }
        if self.validity_days == 0 {
            return Err(Error::Configuration(
                "CERT_VALIDITY_DAYS must be greater than 0".into(),
            ));
        }
        if self.key_bits < MIN_KEY_BITS {
            return Err(Error::Configuration(format!(
                "KEY_BITS must be at least {MIN_KEY_BITS}, got {}",
                self.key_bits
            )));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Configuration("OUTPUT_DIR cannot be empty".into()));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(Error::Configuration(format!(
                "OUTPUT_DIR is not a directory: {}",
                self.output_dir.display()
            )));
        }
        Ok(())
    }
}

/// Passphrase protecting the CA private key.
///
/// Zeroized on drop and redacted in `Debug` output.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct CaPassphrase(String);

impl CaPassphrase {
    /// Wraps a passphrase. An empty string means "no passphrase".
    #[must_use]
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(passphrase.into())
    }

    /// Returns the passphrase, or `None` when the CA key is unencrypted.
    #[must_use]
    pub fn expose(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }
}

impl std::fmt::Debug for CaPassphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("CaPassphrase(none)")
        } else {
            f.write_str("CaPassphrase([REDACTED])")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn valid() -> Configuration {
        Configuration::new("/tmp/localca-out")
    }

    #[test]
    fn defaults_are_valid() {
        let config = valid();
        assert_eq!(config.validity_days, 365);
        assert_eq!(config.country, "US");
        assert!(config.validate().is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("USA" ; "three letters")]
    #[test_case("1A" ; "digit")]
    fn rejects_bad_country(country: &str) {
        let mut config = valid();
        config.country = country.into();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_zero_validity() {
        let mut config = valid();
        config.validity_days = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_small_keys() {
        let mut config = valid();
        config.key_bits = 1024;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_blank_organization() {
        let mut config = valid();
        config.organization = "   ".into();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_output_dir_that_is_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Configuration::new(file.path());
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn passphrase_empty_means_none() {
        assert_eq!(CaPassphrase::new("").expose(), None);
        assert_eq!(CaPassphrase::new("s3cret").expose(), Some("s3cret"));
    }

    #[test]
    fn passphrase_debug_is_redacted() {
        let debug = format!("{:?}", CaPassphrase::new("s3cret"));
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("s3cret"));
    }
}
