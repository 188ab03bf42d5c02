//! Crypto engine backed by the `openssl` command-line tool.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{CryptoEngine, EngineError, EngineResult, SigningRequest, Subject};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `openssl` subcommands, reading PEM output from stdout.
#[derive(Debug, Clone)]
pub struct OpensslEngine {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl OpensslEngine {
    /// Creates an engine using the given `openssl` binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Bounds every invocation; an expired call is killed.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run<I, S>(&self, args: I) -> EngineResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        debug!(
            "Running {} {}",
            self.binary.display(),
            redact(&args).join(" ")
        );

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {e}", self.binary.display())))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => wait_with_deadline(&mut child, limit)?,
            None => child
                .wait()
                .map_err(|e| EngineError::Spawn(format!("failed to wait for openssl: {e}")))?,
        };

        let stdout = join(stdout);
        let stderr = join(stderr);

        if !status.success() {
            let diagnostic = if stderr.trim().is_empty() {
                format!("openssl exited with {status}")
            } else {
                stderr.trim().to_string()
            };
            return Err(EngineError::Failed {
                status: status.code(),
                diagnostic,
            });
        }

        if stdout.trim().is_empty() {
            return Err(EngineError::failed("openssl produced no output"));
        }

        Ok(stdout)
    }
}

impl Default for OpensslEngine {
    fn default() -> Self {
        Self::new("openssl")
    }
}

impl CryptoEngine for OpensslEngine {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn generate_key(&self, bits: u32, passphrase: Option<&str>) -> EngineResult<String> {
        let mut args: Vec<OsString> = vec!["genrsa".into()];
        if let Some(passphrase) = passphrase {
            args.push("-aes256".into());
            args.push("-passout".into());
            args.push(format!("pass:{passphrase}").into());
        }
        args.push(bits.to_string().into());
        self.run(args)
    }

    fn generate_csr(
        &self,
        key: &Path,
        _subject: &Subject<'_>,
        san_record: &Path,
    ) -> EngineResult<String> {
        // Subject fields are read from the record's [ req_distinguished_name ].
        self.run([
            OsStr::new("req"),
            OsStr::new("-new"),
            OsStr::new("-key"),
            key.as_os_str(),
            OsStr::new("-config"),
            san_record.as_os_str(),
        ])
    }

    fn sign_csr(&self, request: &SigningRequest<'_>) -> EngineResult<String> {
        let mut args: Vec<OsString> = vec![
            "x509".into(),
            "-req".into(),
            "-in".into(),
            request.csr.into(),
            "-CA".into(),
            request.ca_cert.into(),
            "-CAkey".into(),
            request.ca_key.into(),
            "-CAcreateserial".into(),
            "-days".into(),
            request.validity_days.to_string().into(),
            "-sha256".into(),
            "-extensions".into(),
            "v3_req".into(),
            "-extfile".into(),
            request.san_record.into(),
        ];
        if let Some(passphrase) = request.ca_passphrase {
            args.push("-passin".into());
            args.push(format!("pass:{passphrase}").into());
        }
        self.run(args)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> EngineResult<std::process::ExitStatus> {
    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Timeout { after: limit });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(EngineError::Spawn(format!("failed to wait for openssl: {e}")));
            }
        }
    }
}

/// Masks `pass:` arguments for logging.
fn redact(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| {
            let a = a.to_string_lossy();
            if a.starts_with("pass:") {
                "pass:[REDACTED]".to_string()
            } else {
                a.into_owned()
            }
        })
        .collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-openssl");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn stdout_is_returned_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let engine = OpensslEngine::new(script(dir.path(), "echo \"PEM $@\""));

        let pem = engine.generate_key(2048, None).unwrap();
        assert_eq!(pem.trim(), "PEM genrsa 2048");
    }

    #[test]
    fn sign_passes_extension_file_and_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let engine = OpensslEngine::new(script(dir.path(), "echo \"$@\""));
        let request = SigningRequest {
            csr: Path::new("/out/a.csr"),
            san_record: Path::new("/out/a.san"),
            ca_key: Path::new("/ca/ca.key"),
            ca_cert: Path::new("/ca/ca.crt"),
            ca_passphrase: Some("pw"),
            validity_days: 30,
        };

        let argv = engine.sign_csr(&request).unwrap();
        assert!(argv.contains("-extensions v3_req -extfile /out/a.san"));
        assert!(argv.contains("-days 30"));
        assert!(argv.trim_end().ends_with("-passin pass:pw"));
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let engine = OpensslEngine::new(script(dir.path(), "echo 'bad decrypt' >&2; exit 1"));

        let err = engine.generate_key(2048, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Failed { status: Some(1), ref diagnostic } if diagnostic == "bad decrypt"
        ));
    }

    #[test]
    fn slow_invocation_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let engine = OpensslEngine::new(script(dir.path(), "sleep 5; echo late"))
            .with_timeout(Some(Duration::from_millis(100)));

        let err = engine.generate_key(2048, None).unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let engine = OpensslEngine::new("/nonexistent/openssl");
        let err = engine.generate_key(2048, None).unwrap_err();
        assert!(matches!(err, EngineError::Spawn(_)));
    }

    #[test]
    fn redact_masks_passphrases() {
        let args: Vec<OsString> = vec!["-passin".into(), "pass:secret".into()];
        assert_eq!(redact(&args), ["-passin", "pass:[REDACTED]"]);
    }
}
