//! # localca-cli
//!
//! Command-line front end for `localca-pki`.
//!
//! One invocation either issues a single certificate
//! (`--common-name`, optional `--subject-alternative-names`) or renews every
//! certificate found in the output directory (`--renew`). Settings come from
//! flags, the environment or a `.env` file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

use std::io::Write;

use localca_pki::Mode;

pub use cli::{Cli, EngineKind, Format, Settings, normalize_args};
pub use error::CliError;
pub use output::OutputFormat;

use commands::{IssueCommand, RenewCommand};

/// Runs one parsed invocation, writing results to `writer`.
///
/// Usage errors are reported before the output directory is touched or the
/// CA password is asked for.
///
/// # Errors
///
/// Returns the first fatal error, or [`CliError::Incomplete`] when a renewal
/// pass had failures.
pub fn run<W: Write>(cli: &Cli, writer: &mut W) -> Result<(), CliError> {
    let mode = Mode::from_invocation(&cli.invocation())?;
    let format = OutputFormat::new(cli.format);
    let config = cli.settings.to_configuration();
    let engine = cli.settings.engine(&config);
    let passphrase = cli.passphrase()?;

    match mode {
        Mode::Issue(identity) => {
            IssueCommand::new(&config, engine.as_ref(), &passphrase).execute(writer, &format, &identity)
        }
        Mode::Renew => RenewCommand::new(&config, engine.as_ref(), &passphrase).execute(writer, &format),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn missing_identity_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("certs");
        let cli = cli(&["localca", "--output-dir", out.to_str().unwrap()]);

        let err = run(&cli, &mut Vec::new()).unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(!out.exists());
    }

    #[test]
    fn renew_on_empty_directory_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("certs");
        let cli = cli(&["localca", "-r", "--engine", "native", "--output-dir", out.to_str().unwrap()]);

        let mut buf = Vec::new();
        run(&cli, &mut buf).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "No certificates to renew\n");
    }

    #[test]
    fn invalid_configuration_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("certs");
        let cli = cli(&[
            "localca",
            "-cn",
            "example.com",
            "--country",
            "USA",
            "--output-dir",
            out.to_str().unwrap(),
        ]);

        let err = run(&cli, &mut Vec::new()).unwrap_err();

        assert!(matches!(err, CliError::Pki(localca_pki::Error::Configuration(_))));
        assert_eq!(err.exit_code(), 1);
        assert!(!out.exists());
    }

    #[test]
    fn failed_renewal_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("certs");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("broken.test.san"), "not a record").unwrap();
        let cli = cli(&["localca", "-r", "--engine", "native", "--output-dir", out.to_str().unwrap()]);

        let mut buf = Vec::new();
        let err = run(&cli, &mut buf).unwrap_err();

        assert!(matches!(err, CliError::Incomplete { failed: 1, total: 1 }));
        assert!(String::from_utf8(buf).unwrap().contains("Renewed: 0, failed: 1"));
    }
}
