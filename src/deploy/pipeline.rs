// ABOUTME: Deploy pipeline orchestrator: lock, hash, extract, promote, prune.
// ABOUTME: One instance per work root, shared by all request handlers.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::store::ArchiveStore;

use super::error::DeployError;
use super::lock::DeployLock;
use super::state::Locked;
use super::{DeployReport, Deployment};

/// Runs uploads through the deploy state machine, one at a time.
#[derive(Debug, Clone)]
pub struct Pipeline {
    store: ArchiveStore,
    lock: Arc<DeployLock>,
}

impl Pipeline {
    pub fn new(store: ArchiveStore) -> Self {
        Self {
            store,
            lock: DeployLock::new(),
        }
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    pub fn lock(&self) -> &Arc<DeployLock> {
        &self.lock
    }

    /// Whether a deploy is currently in flight.
    pub fn is_deploying(&self) -> bool {
        self.lock.is_held()
    }

    /// Deploy an uploaded archive.
    ///
    /// Fails immediately with `DeployError::AlreadyInProgress` if another
    /// deploy holds the lock. The lock is released when this returns,
    /// whatever the outcome.
    pub async fn deploy(&self, body: Bytes) -> Result<DeployReport, DeployError> {
        let guard = self.lock.try_acquire()?;
        let started = Instant::now();
        let upload_bytes = body.len();

        let result = run(Deployment::new(self.store.clone(), guard, body)).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(report) => tracing::info!(
                digest = %report.digest,
                extracted = report.extracted,
                removed = report.removed.len(),
                warnings = report.warnings.len(),
                elapsed_ms,
                "deploy complete"
            ),
            Err(e) => tracing::error!(error = %e, upload_bytes, elapsed_ms, "deploy failed"),
        }

        result
    }
}

async fn run(deployment: Deployment<Locked>) -> Result<DeployReport, DeployError> {
    let deployment = deployment.hash().await?;
    let deployment = deployment.check_store().await?;
    let deployment = deployment.extract().await?;
    let deployment = deployment.promote().await?;
    let deployment = deployment.collect_garbage().await;
    Ok(deployment.finish())
}
