use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressId(pub u64);

/// Work-done notifications for long-running jobs such as a project scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Begin {
        id: ProgressId,
        title: String,
        total: Option<u64>,
    },
    Report {
        id: ProgressId,
        message: Option<String>,
        done: u64,
        total: Option<u64>,
    },
    End {
        id: ProgressId,
        message: Option<String>,
    },
}

pub type ProgressReceiver = broadcast::Receiver<ProgressEvent>;

/// Publishes progress events. Sending never blocks; events nobody listens to
/// are dropped and slow receivers observe `Lagged`.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: broadcast::Sender<ProgressEvent>,
    next_id: Arc<AtomicU64>,
}

impl ProgressSender {
    pub(crate) fn new(tx: broadcast::Sender<ProgressEvent>) -> Self {
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> ProgressReceiver {
        self.tx.subscribe()
    }

    /// Announces a new unit of work. `total` is the expected number of steps
    /// when known up front.
    pub fn start(&self, title: impl Into<String>, total: Option<u64>) -> Progress {
        let report = Report {
            id: ProgressId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            total,
            tx: self.tx.clone(),
            ended: AtomicBool::new(false),
        };
        report.emit(ProgressEvent::Begin {
            id: report.id,
            title: title.into(),
            total,
        });
        Progress {
            report: Arc::new(report),
        }
    }
}

#[derive(Debug)]
struct Report {
    id: ProgressId,
    total: Option<u64>,
    tx: broadcast::Sender<ProgressEvent>,
    ended: AtomicBool,
}

impl Report {
    fn emit(&self, event: ProgressEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    fn end(&self, message: Option<String>) {
        if !self.ended.swap(true, Ordering::AcqRel) {
            self.emit(ProgressEvent::End {
                id: self.id,
                message,
            });
        }
    }
}

impl Drop for Report {
    fn drop(&mut self) {
        self.end(None);
    }
}

/// Handle to one running unit of work. Clones share it; the `End` event is
/// sent by [`Progress::finish`] or when the last clone drops, whichever
/// comes first.
#[derive(Debug, Clone)]
pub struct Progress {
    report: Arc<Report>,
}

impl Progress {
    pub fn id(&self) -> ProgressId {
        self.report.id
    }

    pub fn report(&self, message: impl Into<Option<String>>, done: u64) {
        self.report.emit(ProgressEvent::Report {
            id: self.report.id,
            message: message.into(),
            done,
            total: self.report.total,
        });
    }

    pub fn finish(&self, message: impl Into<Option<String>>) {
        self.report.end(message.into());
    }
}
