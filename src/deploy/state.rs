// ABOUTME: Deploy pipeline state types for the type state pattern.
// ABOUTME: Later states carry the digest and what happened to it so far.

use crate::types::Digest;

/// Lock held, upload received.
/// Available actions: `hash()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Locked;

/// Upload hashed.
/// Available actions: `check_store()`
#[derive(Debug, Clone)]
pub struct Hashed {
    pub(crate) digest: Digest,
}

/// Store consulted for an existing version directory.
/// Available actions: `extract()`
#[derive(Debug, Clone)]
pub struct Checked {
    pub(crate) digest: Digest,
    pub(crate) present: bool,
}

/// Version directory fully extracted on disk.
/// Available actions: `promote()`
#[derive(Debug, Clone)]
pub struct Ready {
    pub(crate) digest: Digest,
    pub(crate) extracted: bool,
}

/// `current` points at the new version.
/// Available actions: `collect_garbage()`
#[derive(Debug, Clone)]
pub struct Promoted {
    pub(crate) digest: Digest,
    pub(crate) extracted: bool,
}

/// Stale versions pruned.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) digest: Digest,
    pub(crate) extracted: bool,
    pub(crate) removed: Vec<String>,
}

impl Hashed {
    pub fn digest(&self) -> &Digest {
        &self.digest
    }
}

impl Checked {
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Whether the version directory already existed.
    pub fn present(&self) -> bool {
        self.present
    }
}

impl Ready {
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Whether this invocation performed the extraction.
    pub fn extracted(&self) -> bool {
        self.extracted
    }
}

impl Promoted {
    pub fn digest(&self) -> &Digest {
        &self.digest
    }
}

impl Completed {
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }
}
