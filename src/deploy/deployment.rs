// ABOUTME: Generic deployment struct parameterized by pipeline state.
// ABOUTME: Owns the lock guard, so dropping a deployment on any path releases the lock.

use bytes::Bytes;
use serde::Serialize;

use crate::diagnostics::{Diagnostics, Warning};
use crate::store::ArchiveStore;
use crate::types::Digest;

use super::lock::LockGuard;
use super::state::{Checked, Completed, Hashed, Locked, Promoted, Ready};

/// One deploy pipeline invocation, parameterized by its current state.
///
/// Each transition consumes the deployment and returns it in the next state,
/// so steps cannot be skipped or reordered. The lock guard travels with the
/// deployment: when it is dropped, whether after `finish()` or on an error
/// return, the processing lock is released.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) store: ArchiveStore,
    pub(crate) body: Bytes,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) _guard: LockGuard,
    pub(crate) state: S,
}

/// What a successful deploy did, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub digest: Digest,
    /// False when the version directory already existed.
    pub extracted: bool,
    /// Work root entries pruned by garbage collection.
    pub removed: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl Deployment<Locked> {
    /// Start a deployment for an uploaded archive. Requires the held lock.
    pub fn new(store: ArchiveStore, guard: LockGuard, body: Bytes) -> Self {
        Deployment {
            store,
            body,
            diagnostics: Diagnostics::default(),
            _guard: guard,
            state: Locked,
        }
    }
}

impl<S> Deployment<S> {
    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    /// Size of the uploaded archive in bytes.
    pub fn upload_len(&self) -> usize {
        self.body.len()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Deployment<Hashed> {
    pub fn digest(&self) -> &Digest {
        self.state.digest()
    }
}

impl Deployment<Checked> {
    pub fn digest(&self) -> &Digest {
        self.state.digest()
    }
}

impl Deployment<Ready> {
    pub fn digest(&self) -> &Digest {
        self.state.digest()
    }
}

impl Deployment<Promoted> {
    pub fn digest(&self) -> &Digest {
        self.state.digest()
    }
}

impl Deployment<Completed> {
    pub fn digest(&self) -> &Digest {
        self.state.digest()
    }
}
