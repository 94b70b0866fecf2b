// ABOUTME: Single-flight processing lock for the deploy pipeline.
// ABOUTME: Acquisition is non-blocking; the returned guard releases on drop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::DeployError;

/// Information about the deploy currently holding the lock.
#[derive(Debug, Clone, Serialize)]
pub struct LockInfo {
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
}

impl LockInfo {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }

    /// How long the holder has been running.
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Process-wide deploy lock.
///
/// Only one pipeline invocation may hold it. A second caller is rejected
/// immediately with [`DeployError::AlreadyInProgress`]; there is no queue.
/// Nothing here coordinates across processes: one receiver per work root.
#[derive(Debug, Default)]
pub struct DeployLock {
    held: Mutex<Option<LockInfo>>,
}

impl DeployLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Try to take the lock without waiting.
    pub fn try_acquire(self: &Arc<Self>) -> Result<LockGuard, DeployError> {
        let mut held = self.held.lock();

        if let Some(existing) = held.as_ref() {
            tracing::debug!(
                started_at = %existing.started_at,
                "rejecting deploy, lock already held"
            );
            return Err(DeployError::lock_held(existing.started_at));
        }

        *held = Some(LockInfo::new());
        Ok(LockGuard {
            lock: Arc::clone(self),
        })
    }

    pub fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }

    /// Details of the current holder, if any.
    pub fn holder(&self) -> Option<LockInfo> {
        self.held.lock().clone()
    }

    fn release(&self) {
        if let Some(info) = self.held.lock().take() {
            tracing::debug!(
                held_ms = info.elapsed().num_milliseconds(),
                "released deploy lock"
            );
        }
    }
}

/// A held deploy lock that releases on drop.
pub struct LockGuard {
    lock: Arc<DeployLock>,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("holder", &self.lock.holder())
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
