//! On-disk artifact store.
//!
//! Every identity owns four files under the output directory, named after
//! its common name: `<CN>.key`, `<CN>.csr`, `<CN>.san` and `<CN>.crt`.
//! Writes go to a hidden staging directory first and are renamed into place
//! only when the whole operation succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identity::{CertificateIdentity, SAN_RECORD_EXTENSION};

const STAGING_PREFIX: &str = ".staging-";

/// The artifacts making up one certificate's artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Private key (PEM).
    Key,
    /// Certificate signing request (PEM).
    Csr,
    /// SAN configuration record.
    SanRecord,
    /// Signed certificate (PEM).
    Certificate,
}

impl ArtifactKind {
    /// All kinds, in the order they are produced during issuance.
    pub const ALL: [Self; 4] = [Self::Key, Self::SanRecord, Self::Csr, Self::Certificate];

    /// File extension for this kind.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Csr => "csr",
            Self::SanRecord => SAN_RECORD_EXTENSION,
            Self::Certificate => "crt",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Key => "private key",
            Self::Csr => "CSR",
            Self::SanRecord => "SAN record",
            Self::Certificate => "certificate",
        })
    }
}

/// Paths of one identity's artifact set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    /// Private key path.
    pub key_path: PathBuf,
    /// CSR path.
    pub csr_path: PathBuf,
    /// SAN configuration record path.
    pub san_path: PathBuf,
    /// Signed certificate path.
    pub cert_path: PathBuf,
}

impl ArtifactPaths {
    fn rooted(dir: &Path, common_name: &str) -> Self {
        let path = |kind: ArtifactKind| dir.join(format!("{common_name}.{}", kind.extension()));
        Self {
            key_path: path(ArtifactKind::Key),
            csr_path: path(ArtifactKind::Csr),
            san_path: path(ArtifactKind::SanRecord),
            cert_path: path(ArtifactKind::Certificate),
        }
    }

    /// Returns the path for one artifact kind.
    #[must_use]
    pub fn get(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Key => &self.key_path,
            ArtifactKind::Csr => &self.csr_path,
            ArtifactKind::SanRecord => &self.san_path,
            ArtifactKind::Certificate => &self.cert_path,
        }
    }
}

/// Filesystem-backed store for artifact sets.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at the output directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the output directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the directory cannot be created.
    pub fn ensure_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            info!("Creating output directory: {}", self.root.display());
        }
        fs::create_dir_all(&self.root).map_err(|e| {
            Error::Storage(format!("failed to create {}: {e}", self.root.display()))
        })
    }

    /// Derives the artifact paths for an identity.
    #[must_use]
    pub fn layout_for(&self, identity: &CertificateIdentity) -> ArtifactPaths {
        ArtifactPaths::rooted(&self.root, identity.common_name())
    }

    /// Checks whether one artifact of a set is present on disk.
    #[must_use]
    pub fn exists(&self, paths: &ArtifactPaths, kind: ArtifactKind) -> bool {
        paths.get(kind).is_file()
    }

    /// Lists every SAN configuration record in the output directory,
    /// sorted by file name.
    ///
    /// Staging directories are skipped; hidden records are listed like any
    /// other. A missing output directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the directory cannot be read.
    pub fn list_san_records(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to read {}: {e}",
                    self.root.display()
                )));
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Storage(format!("failed to read {}: {e}", self.root.display()))
            })?;
            if entry
                .file_name()
                .as_encoded_bytes()
                .starts_with(STAGING_PREFIX.as_bytes())
            {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SAN_RECORD_EXTENSION)
                && path.is_file()
            {
                records.push(path);
            }
        }

        records.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!("Found {} SAN record(s) in {}", records.len(), self.root.display());

        Ok(records)
    }

    /// Opens a staging area for an identity inside the output directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the staging directory cannot be created.
    pub fn stage(&self, identity: &CertificateIdentity) -> Result<Staging> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| {
                Error::Storage(format!(
                    "failed to create staging directory in {}: {e}",
                    self.root.display()
                ))
            })?;

        let staged = ArtifactPaths::rooted(dir.path(), identity.common_name());
        let target = self.layout_for(identity);
        debug!("Staging artifacts for {} in {}", identity.common_name(), dir.path().display());

        Ok(Staging {
            dir,
            staged,
            target,
        })
    }
}

/// Scratch area holding artifacts until they are promoted.
///
/// Dropping an unpromoted `Staging` removes everything written to it.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    staged: ArtifactPaths,
    target: ArtifactPaths,
}

impl Staging {
    /// Paths inside the staging area.
    #[must_use]
    pub const fn paths(&self) -> &ArtifactPaths {
        &self.staged
    }

    /// Writes one artifact into the staging area.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be written.
    pub fn write(&self, kind: ArtifactKind, contents: &str) -> Result<()> {
        let path = self.staged.get(kind);
        fs::write(path, contents)
            .map_err(|e| Error::Storage(format!("failed to write {}: {e}", path.display())))
    }

    /// Renames the given staged artifacts to their final paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if a staged file is missing or a rename
    /// fails. Artifacts renamed before the failure stay promoted.
    pub fn promote(self, kinds: &[ArtifactKind]) -> Result<ArtifactPaths> {
        for &kind in kinds {
            let from = self.staged.get(kind);
            let to = self.target.get(kind);
            fs::rename(from, to).map_err(|e| {
                Error::Storage(format!(
                    "failed to promote {} to {}: {e}",
                    from.display(),
                    to.display()
                ))
            })?;
            debug!("Promoted {}", to.display());
        }

        let target = self.target.clone();
        self.dir.close().map_err(|e| {
            Error::Storage(format!("failed to remove staging directory: {e}"))
        })?;

        Ok(target)
    }
}
