// ABOUTME: Atomic promotion of a version directory to `current`.
// ABOUTME: Builds a temporary symlink and renames it over the live pointer.

use std::fs;
use std::io;
use std::path::Path;

use crate::store::{self, ArchiveStore, CURRENT_TMP_LINK};
use crate::types::Digest;

use super::PromotionError;

/// Point `current` at the version directory for `digest`.
///
/// The only mutation of `current` is a single `rename(2)` of a freshly made
/// link, so readers see either the previous version or the new one. Any
/// failure before or during the rename leaves the previous link untouched.
pub fn promote(store: &ArchiveStore, digest: &Digest) -> Result<(), PromotionError> {
    let target = store.target_path(digest);
    if !target.is_dir() {
        return Err(PromotionError::MissingTarget(target));
    }

    let tmp = store.root().join(CURRENT_TMP_LINK);
    store::remove_entry(&tmp).map_err(|source| PromotionError::Io {
        step: "clear temporary link",
        source,
    })?;

    // Relative link: the target is the bare digest name.
    symlink_dir(Path::new(digest.as_str()), &tmp).map_err(|source| PromotionError::Io {
        step: "create temporary link",
        source,
    })?;

    if let Err(source) = fs::rename(&tmp, store.current_path()) {
        let _ = fs::remove_file(&tmp);
        return Err(PromotionError::Io {
            step: "swap current link",
            source,
        });
    }

    tracing::debug!(digest = %digest, "current now points at new version");
    Ok(())
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
