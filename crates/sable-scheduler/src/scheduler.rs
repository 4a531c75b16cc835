use std::any::Any;
use std::sync::Arc;

use rayon::ThreadPool;
use tokio::sync::broadcast;

use crate::ProgressSender;

enum BlockingPool {
    Rayon(ThreadPool),
    Inline,
}

impl BlockingPool {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            BlockingPool::Rayon(pool) => pool.spawn(job),
            BlockingPool::Inline => job(),
        }
    }

    fn threads(&self) -> usize {
        match self {
            BlockingPool::Rayon(pool) => pool.current_num_threads(),
            BlockingPool::Inline => 0,
        }
    }
}

fn build_rayon_pool(prefix: &'static str, threads: usize) -> BlockingPool {
    // Thread creation fails under low process limits; shrink the pool
    // instead of failing startup.
    let mut threads = threads.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |idx| format!("{prefix}-{idx}"))
            .build()
        {
            Ok(pool) => return BlockingPool::Rayon(pool),
            Err(err) if threads > 1 => {
                tracing::warn!(
                    target: "sable.scheduler",
                    pool = prefix,
                    threads,
                    error = %err,
                    "failed to build worker pool; retrying with fewer threads"
                );
                threads = (threads / 2).max(1);
            }
            Err(err) => {
                tracing::warn!(
                    target: "sable.scheduler",
                    pool = prefix,
                    error = %err,
                    "no worker threads available; running jobs inline"
                );
                return BlockingPool::Inline;
            }
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// File analysis.
    Compute,
    /// Cache maintenance and other work that must not delay analysis.
    Background,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub compute_threads: usize,
    pub background_threads: usize,
    pub progress_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            // Leave a core for the caller's thread; cap it so short-lived
            // processes do not exhaust thread limits.
            compute_threads: available.saturating_sub(1).clamp(1, 8),
            background_threads: available.clamp(1, 2),
            progress_channel_capacity: 1024,
        }
    }
}

impl SchedulerConfig {
    /// Default config with an explicit compute pool size; `0` keeps the default.
    pub fn with_compute_threads(mut self, threads: usize) -> Self {
        if threads > 0 {
            self.compute_threads = threads;
        }
        self
    }
}

/// Handle to the worker pools. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    compute_pool: BlockingPool,
    background_pool: BlockingPool,
    progress: ProgressSender,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("compute_threads", &self.inner.compute_pool.threads())
            .field("background_threads", &self.inner.background_pool.threads())
            .finish()
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let compute_pool = build_rayon_pool("sable-compute", config.compute_threads);
        let background_pool = build_rayon_pool("sable-background", config.background_threads);

        let (progress_tx, _) = broadcast::channel(config.progress_channel_capacity.max(1));
        let progress = ProgressSender::new(progress_tx);

        tracing::debug!(
            target: "sable.scheduler",
            compute_threads = compute_pool.threads(),
            background_threads = background_pool.threads(),
            "scheduler started"
        );

        Self {
            inner: Arc::new(SchedulerInner {
                compute_pool,
                background_pool,
                progress,
            }),
        }
    }

    pub fn compute_threads(&self) -> usize {
        self.inner.compute_pool.threads()
    }

    pub fn progress(&self) -> ProgressSender {
        self.inner.progress.clone()
    }

    pub fn subscribe_progress(&self) -> crate::ProgressReceiver {
        self.inner.progress.subscribe()
    }

    /// Runs `job` on `pool`. Submission never blocks the caller.
    ///
    /// A panicking job is logged and dropped; the worker keeps serving.
    pub fn spawn_on<F>(&self, pool: PoolKind, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job = move || {
            if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                tracing::error!(
                    target: "sable.scheduler",
                    pool = ?pool,
                    panic = %panic_message(&*panic),
                    "task panicked"
                );
            }
        };

        match pool {
            PoolKind::Compute => self.inner.compute_pool.spawn(job),
            PoolKind::Background => self.inner.background_pool.spawn(job),
        }
    }

    pub fn spawn_compute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn_on(PoolKind::Compute, job);
    }

    pub fn spawn_background<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn_on(PoolKind::Background, job);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
