//! CLI error types.

use std::fmt;

/// Exit status for usage errors, matching clap's own.
pub const USAGE_EXIT_CODE: u8 = 2;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Error reported by the certificate core.
    Pki(localca_pki::Error),
    /// Output formatting error.
    Format(String),
    /// Some renewals failed.
    Incomplete {
        /// Records that failed.
        failed: usize,
        /// Records processed.
        total: usize,
    },
    /// IO error.
    Io(std::io::Error),
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Pki(err) if err.is_usage() => USAGE_EXIT_CODE,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pki(err) => write!(f, "{err}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Incomplete { failed, total } => {
                write!(f, "{failed} of {total} certificate(s) could not be renewed")
            }
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pki(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<localca_pki::Error> for CliError {
    fn from(err: localca_pki::Error) -> Self {
        Self::Pki(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_with_two() {
        let err = CliError::from(localca_pki::Error::Usage("missing --common-name".into()));
        assert_eq!(err.exit_code(), USAGE_EXIT_CODE);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err = CliError::from(localca_pki::Error::Configuration("bad country".into()));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(CliError::Incomplete { failed: 1, total: 3 }.exit_code(), 1);
    }

    #[test]
    fn cli_error_display_incomplete() {
        let err = CliError::Incomplete { failed: 2, total: 5 };
        assert_eq!(err.to_string(), "2 of 5 certificate(s) could not be renewed");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
