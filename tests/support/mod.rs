// ABOUTME: Test support utilities.
// ABOUTME: Builds gzipped tarballs in memory and sets up temporary work roots.

use std::io::Write;
use std::path::Path;
use std::sync::Once;

use flate2::Compression;
use flate2::write::GzEncoder;
use lander::store::ArchiveStore;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("lander=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A gzipped tarball holding the given regular files.
#[allow(dead_code)]
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    gzip(&builder.into_inner().unwrap())
}

/// Gzip arbitrary bytes.
#[allow(dead_code)]
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// A fresh work root inside a temp dir. Keep the `TempDir` alive for the test.
#[allow(dead_code)]
pub fn work_root() -> (tempfile::TempDir, ArchiveStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ArchiveStore::open(dir.path().join("work")).unwrap();
    (dir, store)
}

/// Sorted names of everything directly inside `root`.
#[allow(dead_code)]
pub fn entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Expected `entries()` output for the given names.
#[allow(dead_code)]
pub fn listing(names: &[&str]) -> Vec<String> {
    let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    names.sort();
    names
}
