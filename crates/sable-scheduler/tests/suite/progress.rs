use pretty_assertions::assert_eq;
use sable_scheduler::{ProgressEvent, Scheduler, SchedulerConfig};

#[test]
fn progress_runs_begin_report_end() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let mut rx = scheduler.subscribe_progress();

    let progress = scheduler.progress().start("Indexing", Some(2));
    let id = progress.id();
    progress.report(Some("A.java".to_string()), 1);
    let clone = progress.clone();
    drop(progress);
    clone.report(None, 2);
    drop(clone);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            ProgressEvent::Begin {
                id,
                title: "Indexing".to_string(),
                total: Some(2),
            },
            ProgressEvent::Report {
                id,
                message: Some("A.java".to_string()),
                done: 1,
                total: Some(2),
            },
            ProgressEvent::Report {
                id,
                message: None,
                done: 2,
                total: Some(2),
            },
            ProgressEvent::End { id, message: None },
        ]
    );
}

#[test]
fn finish_is_reported_once() {
    let scheduler = Scheduler::default();
    let mut rx = scheduler.subscribe_progress();
    let progress = scheduler.progress().start("Scan", None);
    progress.finish(Some("done".to_string()));
    drop(progress);

    let ends = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|event| matches!(event, ProgressEvent::End { .. }))
        .count();
    assert_eq!(ends, 1);
}
