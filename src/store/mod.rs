// ABOUTME: On-disk layout of the work root: one directory per digest plus `current`.
// ABOUTME: Maps digests to paths and reports which versions are fully extracted.

mod error;

pub use error::StoreError;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::types::Digest;

/// Name of the live-deployment symlink under the work root.
pub const CURRENT_LINK: &str = "current";

/// Temporary symlink name used while swapping `current`.
pub const CURRENT_TMP_LINK: &str = ".current.tmp";

const STAGING_PREFIX: &str = ".staging-";

/// The work root and everything the receiver keeps beneath it.
///
/// Layout:
///
/// ```text
/// <root>/<digest>/...            extracted version directories
/// <root>/current -> <digest>     live deployment
/// <root>/.staging-<digest>/      extraction in flight (transient)
/// <root>/.current.tmp            pointer swap in flight (transient)
/// ```
///
/// A version directory only appears once its contents were fully extracted
/// into staging and renamed into place, so `exists` means "fully extracted".
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    /// Open the store, creating the work root and its parents if absent.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io("create work root", &root, e))?;

        if !root.is_dir() {
            return Err(StoreError::NotADirectory(root));
        }

        tracing::debug!(root = %root.display(), "opened archive store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.as_str())
    }

    pub fn staging_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(format!("{STAGING_PREFIX}{digest}"))
    }

    pub fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_LINK)
    }

    /// Whether a version directory for this digest is present.
    pub fn exists(&self, digest: &Digest) -> bool {
        self.target_path(digest).is_dir()
    }

    /// Create the version directory for a digest if it is absent.
    pub fn ensure(&self, digest: &Digest) -> Result<PathBuf, StoreError> {
        let path = self.target_path(digest);
        fs::create_dir_all(&path).map_err(|e| StoreError::io("create version directory", &path, e))?;
        if !path.is_dir() {
            return Err(StoreError::NotADirectory(path));
        }
        Ok(path)
    }

    /// Create an empty staging directory, discarding leftovers from a failed attempt.
    pub fn prepare_staging(&self, digest: &Digest) -> Result<PathBuf, StoreError> {
        let path = self.staging_path(digest);
        remove_entry(&path).map_err(|e| StoreError::io("clear staging directory", &path, e))?;
        fs::create_dir(&path).map_err(|e| StoreError::io("create staging directory", &path, e))?;
        Ok(path)
    }

    /// Move a fully extracted staging directory to its version directory.
    pub fn commit_staging(&self, digest: &Digest) -> Result<PathBuf, StoreError> {
        let staging = self.staging_path(digest);
        let target = self.target_path(digest);
        fs::rename(&staging, &target).map_err(|e| StoreError::io("commit staging directory", &target, e))?;
        Ok(target)
    }

    /// Remove a staging directory. Missing directories are not an error.
    pub fn discard_staging(&self, digest: &Digest) -> Result<(), StoreError> {
        let path = self.staging_path(digest);
        remove_entry(&path).map_err(|e| StoreError::io("discard staging directory", &path, e))
    }

    /// Digest the `current` link points at, if any.
    ///
    /// Returns `None` before the first deploy, or when the link target is not
    /// a digest name.
    pub fn current(&self) -> Result<Option<Digest>, StoreError> {
        let link = self.current_path();
        match fs::read_link(&link) {
            Ok(target) => Ok(target
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| Digest::parse(name).ok())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("read current link", &link, e)),
        }
    }

    /// Names of every entry directly under the work root.
    pub fn entries(&self) -> Result<Vec<String>, StoreError> {
        let read = fs::read_dir(&self.root).map_err(|e| StoreError::io("list work root", &self.root, e))?;

        let mut names = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| StoreError::io("list work root", &self.root, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Digests of the version directories currently on disk.
    pub fn versions(&self) -> Result<Vec<Digest>, StoreError> {
        Ok(self
            .entries()?
            .iter()
            .filter_map(|name| Digest::parse(name).ok())
            .filter(|digest| self.exists(digest))
            .collect())
    }
}

/// Remove a file, symlink, or directory tree without following links.
pub(crate) fn remove_entry(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
