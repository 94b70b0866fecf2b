// ABOUTME: Garbage collection of superseded versions under the work root.
// ABOUTME: Keeps `current` and the just-promoted digest; removal is best effort.

use serde::Serialize;

use crate::store::{self, ArchiveStore, CURRENT_LINK};
use crate::types::Digest;

/// An entry that could not be removed.
#[derive(Debug, Clone, Serialize)]
pub struct GcFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a collection pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GcReport {
    /// Entry names that were deleted.
    pub removed: Vec<String>,
    /// Entries that survived because deletion failed.
    pub failures: Vec<GcFailure>,
}

impl GcReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Remove every entry under the work root except `current` and `keep`.
///
/// Stale version directories, leftover staging directories, and stray files
/// all go. Individual failures are logged and reported, never returned as an
/// error: a survivor only costs disk space until the next successful deploy.
pub fn collect_garbage(store: &ArchiveStore, keep: &Digest) -> GcReport {
    let mut report = GcReport::default();

    let entries = match store.entries() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "failed to list work root for garbage collection");
            report.failures.push(GcFailure {
                name: store.root().display().to_string(),
                error: e.to_string(),
            });
            return report;
        }
    };

    for name in entries {
        if name == CURRENT_LINK || name == keep.as_str() {
            continue;
        }

        match store::remove_entry(&store.root().join(&name)) {
            Ok(()) => {
                tracing::debug!(entry = %name, "removed stale entry");
                report.removed.push(name);
            }
            Err(e) => {
                tracing::warn!(entry = %name, error = %e, "failed to remove stale entry");
                report.failures.push(GcFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn keeps_current_and_promoted_digest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::open(dir.path()).unwrap();
        let old = Digest::of(b"old");
        let new = Digest::of(b"new");
        store.ensure(&old).unwrap();
        store.ensure(&new).unwrap();
        std::os::unix::fs::symlink(new.as_str(), store.current_path()).unwrap();

        let report = collect_garbage(&store, &new);

        assert!(report.is_clean());
        assert_eq!(report.removed, vec![old.to_string()]);
        let mut expected = vec![new.to_string(), CURRENT_LINK.to_string()];
        expected.sort();
        assert_eq!(store.entries().unwrap(), expected);
    }

    #[test]
    fn removes_staging_leftovers_and_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::open(dir.path()).unwrap();
        let keep = Digest::of(b"keep");
        store.ensure(&keep).unwrap();
        store.prepare_staging(&Digest::of(b"failed")).unwrap();
        fs::write(store.root().join("stray.txt"), b"x").unwrap();

        let report = collect_garbage(&store, &keep);

        assert_eq!(report.removed.len(), 2);
        assert_eq!(store.entries().unwrap(), vec![keep.to_string()]);
    }

    #[test]
    fn listing_failure_is_reported_not_returned() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::open(dir.path().join("work")).unwrap();
        fs::remove_dir(store.root()).unwrap();

        let report = collect_garbage(&store, &Digest::of(b"any"));

        assert!(!report.is_clean());
        assert!(report.removed.is_empty());
    }
}
