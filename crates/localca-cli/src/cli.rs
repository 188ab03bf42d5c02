//! Command-line argument parsing with clap.

use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};
use localca_pki::config::{DEFAULT_KEY_BITS, DEFAULT_VALIDITY_DAYS};
use localca_pki::{CaPassphrase, Configuration, CryptoEngine, Invocation, NativeEngine, OpensslEngine};

const PASSWORD_PROMPT: &str = "Enter password for CA private key (if any): ";

/// Single-dash spellings accepted for compatibility with older scripts.
const LEGACY_FLAGS: [(&str, &str); 3] = [
    ("-cn", "--common-name"),
    ("-san", "--subject-alternative-names"),
    ("-pw", "--password"),
];

/// localca - issue and renew certificates signed by a local CA.
#[derive(Parser, Debug, Clone)]
#[command(name = "localca")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Common name of the certificate to issue.
    #[arg(long = "common-name", visible_alias = "cn", value_name = "CN")]
    pub common_name: Option<String>,

    /// Comma-separated subject alternative names. Defaults to the common name.
    #[arg(long = "subject-alternative-names", visible_alias = "san", value_name = "LIST")]
    pub subject_alternative_names: Option<String>,

    /// Passphrase of the CA private key. Prompted for on a terminal when
    /// neither this flag nor `CA_PASSWORD` is set.
    #[arg(long, visible_alias = "pw", env = "CA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Renew every certificate that has a SAN record in the output directory.
    #[arg(short, long)]
    pub renew: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// CA, subject and engine settings.
    #[command(flatten)]
    pub settings: Settings,
}

/// Settings normally supplied through the environment or `.env`.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// CA private key.
    #[arg(long, env = "CA_KEY", default_value = "./ca.key")]
    pub ca_key: PathBuf,

    /// CA certificate.
    #[arg(long, env = "CA_CERT", default_value = "./ca.crt")]
    pub ca_cert: PathBuf,

    /// Directory holding the issued artifacts.
    #[arg(long, env = "OUTPUT_DIR", default_value = "./certs")]
    pub output_dir: PathBuf,

    /// Subject organization (O).
    #[arg(long, env = "ORGANIZATION", default_value = "DefaultOrganization")]
    pub organization: String,

    /// Subject country (C), two letters.
    #[arg(long, env = "COUNTRY", default_value = "US")]
    pub country: String,

    /// Certificate validity in days.
    #[arg(long, env = "CERT_VALIDITY_DAYS", default_value_t = DEFAULT_VALIDITY_DAYS)]
    pub validity_days: u32,

    /// RSA key size for new keys.
    #[arg(long, env = "KEY_BITS", default_value_t = DEFAULT_KEY_BITS)]
    pub key_bits: u32,

    /// Seconds before a crypto operation is abandoned.
    #[arg(long = "engine-timeout", env = "ENGINE_TIMEOUT_SECS", value_name = "SECS")]
    pub engine_timeout_secs: Option<u64>,

    /// Crypto engine.
    #[arg(long, env = "CRYPTO_ENGINE", value_enum, default_value_t = EngineKind::Openssl)]
    pub engine: EngineKind,

    /// Path of the openssl binary.
    #[arg(long = "openssl", env = "OPENSSL_BIN", default_value = "openssl", value_name = "PATH")]
    pub openssl_bin: PathBuf,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Available crypto engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum EngineKind {
    /// Shell out to the openssl binary.
    #[default]
    Openssl,
    /// In-process RSA and X.509.
    Native,
}

impl Cli {
    /// The issuance intent of this invocation.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation {
            common_name: self.common_name.clone(),
            subject_alternative_names: self.subject_alternative_names.clone(),
            renew: self.renew,
        }
    }

    /// The CA passphrase; empty means none.
    ///
    /// Without `--password` or `CA_PASSWORD`, asks for it without echo when
    /// stdin is a terminal. Non-interactive runs get no passphrase.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    pub fn passphrase(&self) -> io::Result<CaPassphrase> {
        self.passphrase_with(io::stdin().is_terminal(), || {
            rpassword::prompt_password(PASSWORD_PROMPT)
        })
    }

    fn passphrase_with<F>(&self, interactive: bool, prompt: F) -> io::Result<CaPassphrase>
    where
        F: FnOnce() -> io::Result<String>,
    {
        match &self.password {
            Some(password) => Ok(CaPassphrase::new(password.clone())),
            None if interactive => prompt().map(CaPassphrase::new),
            None => Ok(CaPassphrase::default()),
        }
    }
}

impl Settings {
    /// Builds the core configuration.
    #[must_use]
    pub fn to_configuration(&self) -> Configuration {
        Configuration {
            ca_key: self.ca_key.clone(),
            ca_cert: self.ca_cert.clone(),
            output_dir: self.output_dir.clone(),
            organization: self.organization.clone(),
            country: self.country.clone(),
            validity_days: self.validity_days,
            key_bits: self.key_bits,
            engine_timeout: self
                .engine_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Builds the selected crypto engine for a configuration.
    #[must_use]
    pub fn engine(&self, config: &Configuration) -> Box<dyn CryptoEngine> {
        match self.engine {
            EngineKind::Openssl => Box::new(self.openssl_engine(config)),
            EngineKind::Native => Box::new(NativeEngine::new()),
        }
    }

    fn openssl_engine(&self, config: &Configuration) -> OpensslEngine {
        OpensslEngine::new(&self.openssl_bin).with_timeout(config.engine_timeout)
    }
}

/// Rewrites `-cn`, `-san` and `-pw` (also in `-cn=value` form) to their long
/// spellings. Everything else passes through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            let Some(text) = arg.to_str() else {
                return arg;
            };
            for (legacy, long) in LEGACY_FLAGS {
                if text == legacy {
                    return OsString::from(long);
                }
                if let Some(value) = text.strip_prefix(legacy).and_then(|rest| rest.strip_prefix('=')) {
                    return OsString::from(format!("{long}={value}"));
                }
            }
            arg
        })
        .collect()
}
