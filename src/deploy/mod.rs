// ABOUTME: Deploy pipeline using the type state pattern.
// ABOUTME: Exports state markers, the orchestrator, and the filesystem steps it sequences.

mod deployment;
mod error;
mod extract;
mod gc;
mod lock;
mod pipeline;
mod promote;
mod state;
mod transitions;

pub use deployment::{DeployReport, Deployment};
pub use error::{DeployError, DeployErrorKind, ExtractionError, LockHolderInfo, PromotionError};
pub use extract::{ExtractStats, extract_archive};
pub use gc::{GcFailure, GcReport, collect_garbage};
pub use lock::{DeployLock, LockGuard, LockInfo};
pub use pipeline::Pipeline;
pub use promote::promote;
pub use state::{Checked, Completed, Hashed, Locked, Promoted, Ready};
