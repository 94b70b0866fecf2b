// ABOUTME: Unpacks gzip-compressed tar archives into a version directory.
// ABOUTME: Rejects path traversal, escaping symlinks, and exotic entry types.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tar::Archive;

use super::ExtractionError;

/// What an extraction wrote to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    /// Uncompressed size of all regular files.
    pub bytes: u64,
}

impl ExtractStats {
    pub fn entries(&self) -> usize {
        self.files + self.directories + self.symlinks
    }
}

/// Decompress and unpack `data` into `dest`, preserving relative paths.
///
/// `dest` must already exist. Only regular files, directories, and symlinks
/// that resolve inside `dest` are accepted, and no entry may be written
/// through a symlink unpacked earlier. Directories are created with default
/// permissions; file modes are kept without setuid/setgid/sticky bits. On
/// error `dest` may hold a partial tree and must be discarded by the caller.
pub fn extract_archive(data: &[u8], dest: &Path) -> Result<ExtractStats, ExtractionError> {
    let mut archive = Archive::new(GzDecoder::new(data));
    archive.set_overwrite(true);

    let mut stats = ExtractStats::default();
    let entries = archive.entries().map_err(ExtractionError::Malformed)?;

    for entry in entries {
        let mut entry = entry.map_err(ExtractionError::Malformed)?;
        let path = entry.path().map_err(ExtractionError::Malformed)?.into_owned();
        let entry_type = entry.header().entry_type();

        if entry_type.is_pax_global_extensions()
            || entry_type.is_pax_local_extensions()
            || entry_type.is_gnu_longname()
            || entry_type.is_gnu_longlink()
        {
            continue;
        }

        if !is_contained(&path) {
            return Err(ExtractionError::PathTraversal(path));
        }

        let through_link = parent_through_symlink(dest, &path).map_err(|source| {
            ExtractionError::Io {
                path: path.clone(),
                source,
            }
        })?;
        if through_link {
            return Err(ExtractionError::PathTraversal(path));
        }

        if entry_type.is_dir() {
            // Archive modes are not applied to directories: a read-only
            // directory would reject its own children and later pruning.
            fs::create_dir_all(dest.join(&path)).map_err(|source| ExtractionError::Io {
                path: path.clone(),
                source,
            })?;
            stats.directories += 1;
            continue;
        }

        if entry_type.is_file() {
            stats.files += 1;
            stats.bytes += entry.size();
        } else if entry_type.is_symlink() {
            let target = entry
                .link_name()
                .map_err(ExtractionError::Malformed)?
                .ok_or_else(|| ExtractionError::UnsupportedEntry {
                    path: path.clone(),
                    kind: "symlink without target".to_string(),
                })?;
            if link_escapes(&path, &target) {
                return Err(ExtractionError::PathTraversal(path));
            }
            stats.symlinks += 1;
        } else {
            return Err(ExtractionError::UnsupportedEntry {
                path,
                kind: format!("{:?}", entry_type),
            });
        }

        let unpacked = entry
            .unpack_in(dest)
            .map_err(|source| ExtractionError::Io {
                path: path.clone(),
                source,
            })?;
        if !unpacked {
            return Err(ExtractionError::PathTraversal(path));
        }
    }

    if stats.entries() == 0 {
        return Err(ExtractionError::Empty);
    }

    Ok(stats)
}

/// A relative path with no `..`, root, or drive prefix components.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Whether an already unpacked ancestor of `path` under `dest` is a symlink.
///
/// Stops at the first ancestor that does not exist yet.
fn parent_through_symlink(dest: &Path, path: &Path) -> std::io::Result<bool> {
    let Some(parent) = path.parent() else {
        return Ok(false);
    };

    let mut current = dest.to_path_buf();
    for component in parent.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        current.push(name);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        }
    }

    Ok(false)
}

/// Whether a symlink at `link` pointing to `target` may resolve outside the root.
///
/// `..` is only accepted before the first normal component of `target`: a
/// later one could climb out of a directory that is itself a link.
fn link_escapes(link: &Path, target: &Path) -> bool {
    let mut depth = link
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);

    let mut descended = false;
    for component in target.components() {
        match component {
            Component::Normal(_) => {
                depth += 1;
                descended = true;
            }
            Component::CurDir => {}
            Component::ParentDir if descended => return true,
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }

    false
}
