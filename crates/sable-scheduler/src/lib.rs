//! Worker pools for background analysis.
//!
//! CPU-bound work runs on bounded rayon pools. Jobs are submitted and
//! forgotten: callers report results through their own channels or state.
//! Panics are caught at the job boundary and logged so a pool never loses
//! its workers.

mod progress;
mod scheduler;

pub use progress::{Progress, ProgressEvent, ProgressId, ProgressReceiver, ProgressSender};
pub use scheduler::{PoolKind, Scheduler, SchedulerConfig};
