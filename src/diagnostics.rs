// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deploy.
// ABOUTME: Collects warnings that shouldn't fail a deploy but are reported to the caller.

use serde::Serialize;

use crate::deploy::GcReport;

/// Collects non-fatal warnings during deploy operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Record one warning per entry the garbage collector could not remove.
    pub fn record_gc(&mut self, report: &GcReport) {
        for failure in &report.failures {
            self.warn(Warning::garbage_collection(format!(
                "could not remove {}: {}",
                failure.name, failure.error
            )));
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a deploy.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A stale entry survived garbage collection.
    pub fn garbage_collection(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::GarbageCollection,
            message: message.into(),
        }
    }

    /// A failed extraction's staging directory could not be removed.
    pub fn staging_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::StagingCleanup,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Stale version directory left on disk.
    GarbageCollection,
    /// Partial extraction left on disk.
    StagingCleanup,
}
