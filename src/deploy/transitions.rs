// ABOUTME: State transition methods for the deploy pipeline.
// ABOUTME: Each method consumes self and returns the next state on success.

use crate::diagnostics::Warning;
use crate::types::Digest;

use super::Deployment;
use super::error::DeployError;
use super::extract::extract_archive;
use super::gc::collect_garbage;
use super::promote::promote;
use super::state::{Checked, Completed, Hashed, Locked, Promoted, Ready};
use super::DeployReport;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    /// Internal helper to move to the next state, keeping everything else.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            store: self.store,
            body: self.body,
            diagnostics: self.diagnostics,
            _guard: self._guard,
            state,
        }
    }
}

/// Run filesystem or CPU-heavy work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, DeployError>
where
    F: FnOnce() -> Result<T, DeployError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

// =============================================================================
// Locked -> Hashed
// =============================================================================

impl Deployment<Locked> {
    /// Compute the content digest of the uploaded archive.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::UploadMissing` if the upload is empty.
    #[must_use = "deployment state must be used"]
    pub async fn hash(self) -> Result<Deployment<Hashed>, DeployError> {
        if self.body.is_empty() {
            return Err(DeployError::UploadMissing);
        }

        let body = self.body.clone();
        let digest = blocking(move || Ok(Digest::of(&body))).await?;
        tracing::debug!(digest = %digest, bytes = self.body.len(), "hashed upload");

        Ok(self.transition(Hashed { digest }))
    }
}

// =============================================================================
// Hashed -> Checked
// =============================================================================

impl Deployment<Hashed> {
    /// Look for an existing version directory with this digest.
    #[must_use = "deployment state must be used"]
    pub async fn check_store(self) -> Result<Deployment<Checked>, DeployError> {
        let store = self.store.clone();
        let digest = self.state.digest.clone();
        let present = blocking(move || Ok(store.exists(&digest))).await?;
        tracing::debug!(digest = %self.state.digest, present, "checked archive store");

        let digest = self.state.digest.clone();
        Ok(self.transition(Checked { digest, present }))
    }
}

// =============================================================================
// Checked -> Ready
// =============================================================================

impl Deployment<Checked> {
    /// Extract the archive unless its version directory already exists.
    ///
    /// Extraction writes into a staging directory that is renamed into place
    /// only after every entry was unpacked, so a version directory never holds
    /// a partial tree. A failed extraction's staging directory is removed.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Extraction` for bad archives and
    /// `DeployError::Store` if staging cannot be created or committed.
    #[must_use = "deployment state must be used"]
    pub async fn extract(mut self) -> Result<Deployment<Ready>, DeployError> {
        let digest = self.state.digest.clone();

        if self.state.present {
            tracing::info!(digest = %digest, "version already extracted, skipping");
            return Ok(self.transition(Ready {
                digest,
                extracted: false,
            }));
        }

        let store = self.store.clone();
        let body = self.body.clone();
        let staged = digest.clone();
        let outcome = blocking(move || {
            let staging = store.prepare_staging(&staged)?;
            let result = extract_archive(&body, &staging);
            if result.is_ok() {
                store.commit_staging(&staged)?;
            }
            Ok(result)
        })
        .await?;

        match outcome {
            Ok(stats) => {
                tracing::info!(
                    digest = %digest,
                    files = stats.files,
                    directories = stats.directories,
                    symlinks = stats.symlinks,
                    bytes = stats.bytes,
                    "extracted archive"
                );
                Ok(self.transition(Ready {
                    digest,
                    extracted: true,
                }))
            }
            Err(e) => {
                let store = self.store.clone();
                let staged = digest.clone();
                let cleanup = blocking(move || Ok(store.discard_staging(&staged))).await?;
                if let Err(cleanup_err) = cleanup {
                    self.diagnostics.warn(Warning::staging_cleanup(format!(
                        "failed to discard staging for {}: {}",
                        digest.short(),
                        cleanup_err
                    )));
                }
                Err(e.into())
            }
        }
    }
}

// =============================================================================
// Ready -> Promoted
// =============================================================================

impl Deployment<Ready> {
    /// Atomically point `current` at the version directory.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Promotion`; the previous `current` is untouched.
    #[must_use = "deployment state must be used"]
    pub async fn promote(self) -> Result<Deployment<Promoted>, DeployError> {
        let store = self.store.clone();
        let digest = self.state.digest.clone();
        blocking(move || promote(&store, &digest).map_err(DeployError::from)).await?;
        tracing::info!(digest = %self.state.digest, "promoted to current");

        let Ready { digest, extracted } = self.state.clone();
        Ok(self.transition(Promoted { digest, extracted }))
    }
}

// =============================================================================
// Promoted -> Completed
// =============================================================================

impl Deployment<Promoted> {
    /// Prune everything except `current` and the promoted version.
    ///
    /// Never fails: removal problems become warnings on the deployment.
    #[must_use = "deployment state must be used"]
    pub async fn collect_garbage(mut self) -> Deployment<Completed> {
        let store = self.store.clone();
        let digest = self.state.digest.clone();
        let report = match blocking(move || Ok(collect_garbage(&store, &digest))).await {
            Ok(report) => report,
            Err(e) => {
                self.diagnostics.warn(Warning::garbage_collection(format!(
                    "garbage collection did not run: {e}"
                )));
                Default::default()
            }
        };

        self.diagnostics.record_gc(&report);
        if !report.removed.is_empty() {
            tracing::info!(removed = report.removed.len(), "pruned stale versions");
        }

        let Promoted { digest, extracted } = self.state.clone();
        self.transition(Completed {
            digest,
            extracted,
            removed: report.removed,
        })
    }
}

// =============================================================================
// Completed -> (lock released)
// =============================================================================

impl Deployment<Completed> {
    /// Finish the deployment, releasing the processing lock.
    pub fn finish(self) -> DeployReport {
        let Completed {
            digest,
            extracted,
            removed,
        } = self.state;

        DeployReport {
            digest,
            extracted,
            removed,
            warnings: self.diagnostics.into_warnings(),
        }
    }
}
