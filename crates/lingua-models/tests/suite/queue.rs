use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lingua_models::{ExecutionQueue, ResourceError, ResourceId};
use tokio::time::Instant;

use super::support::{descriptor, manager_with, ScriptedLoader};

fn queue(total: u64) -> (ExecutionQueue, Arc<ScriptedLoader>) {
    let loader = ScriptedLoader::new(Duration::from_millis(100));
    let manager = manager_with(
        total,
        vec![
            (descriptor("translation", 150), loader.clone()),
            (descriptor("speech", 80), loader.clone()),
        ],
    );
    (ExecutionQueue::new(manager), loader)
}

#[tokio::test(start_paused = true)]
async fn operations_run_one_at_a_time_in_submission_order() {
    let (queue, _loader) = queue(1_000);
    let log = Arc::new(Mutex::new(Vec::new()));
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));

    let submissions: Vec<_> = (0..6)
        .map(|i| {
            let resource = if i % 2 == 0 { "translation" } else { "speech" };
            let log = log.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            queue.submit(resource, move |_lease| async move {
                let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now_active, Ordering::SeqCst);
                let start = Instant::now();
                tokio::time::sleep(Duration::from_millis(10 * (6 - i))).await;
                let end = Instant::now();
                active.fetch_sub(1, Ordering::SeqCst);
                log.lock().unwrap().push((i, start, end));
                Ok::<_, String>(i)
            })
        })
        .collect();

    for (expected, submission) in submissions.into_iter().enumerate() {
        assert_eq!(submission.await, Ok(expected as u64));
    }

    let log = log.lock().unwrap();
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
    assert_eq!(log.iter().map(|(i, _, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    for pair in log.windows(2) {
        let (_, _, previous_end) = pair[0];
        let (_, next_start, _) = pair[1];
        assert!(next_start >= previous_end);
    }
}

#[tokio::test(start_paused = true)]
async fn failures_are_delivered_only_to_their_caller() {
    let (queue, _loader) = queue(1_000);

    let ok = queue.submit("translation", |_lease| async { Ok::<_, String>("hola") });
    let failed = queue.submit("translation", |_lease| async {
        Err::<&str, _>("unsupported language pair")
    });
    let panicked = queue.submit("translation", |_lease| async {
        if true {
            panic!("phrase table exploded");
        }
        Ok::<&str, String>("unreachable")
    });
    let after = queue.submit("translation", |_lease| async { Ok::<_, String>("adiós") });

    assert_eq!(ok.await, Ok("hola"));
    assert_eq!(
        failed.await,
        Err(ResourceError::OperationFailure("unsupported language pair".to_owned()))
    );
    assert!(matches!(
        panicked.await,
        Err(ResourceError::OperationFailure(message)) if message.contains("phrase table exploded")
    ));
    assert_eq!(after.await, Ok("adiós"));
    assert!(queue
        .manager()
        .status(&ResourceId::new("translation"))
        .unwrap()
        .status
        .is_loaded());
}

#[tokio::test(start_paused = true)]
async fn load_errors_do_not_stop_the_drain_loop() {
    let (queue, loader) = queue(200);

    let first = queue.submit("translation", |_lease| async { Ok::<_, String>(1) });
    let rejected = queue.submit("speech", |_lease| async { Ok::<_, String>(2) });
    let unknown = queue.submit("ocr", |_lease| async { Ok::<_, String>(3) });
    let last = queue.submit("translation", |_lease| async { Ok::<_, String>(4) });

    assert_eq!(first.await, Ok(1));
    assert!(matches!(
        rejected.await,
        Err(ResourceError::InsufficientMemory { requested: 80, .. })
    ));
    assert_eq!(
        unknown.await,
        Err(ResourceError::UnknownResource(ResourceId::new("ocr")))
    );
    assert_eq!(last.await, Ok(4));
    assert_eq!(loader.loads(), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_submission_does_not_stall_the_queue() {
    let (queue, _loader) = queue(1_000);

    let dropped = queue.submit("speech", |_lease| async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, String>(())
    });
    drop(dropped);
    let kept = queue.submit("speech", |_lease| async { Ok::<_, String>("spoken") });

    assert_eq!(kept.await, Ok("spoken"));
}

#[tokio::test(start_paused = true)]
async fn reports_pending_work_and_drain_state() {
    let (queue, _loader) = queue(1_000);
    assert!(!queue.is_draining());

    let submissions: Vec<_> = (0..3)
        .map(|i| queue.submit("translation", move |_lease| async move { Ok::<_, String>(i) }))
        .collect();
    assert_eq!(queue.pending(), 3);
    assert!(queue.is_draining());

    for submission in submissions {
        submission.await.unwrap();
    }
    assert_eq!(queue.pending(), 0);
    assert!(!queue.is_draining());
}

#[tokio::test(start_paused = true)]
async fn closing_rejects_queued_and_new_work() {
    let (queue, _loader) = queue(1_000);

    let queued: Vec<_> = (0..3)
        .map(|i| queue.submit("translation", move |_lease| async move { Ok::<_, String>(i) }))
        .collect();
    assert_eq!(queue.close(), 3);

    for submission in queued {
        assert_eq!(submission.await, Err(ResourceError::QueueClosed));
    }
    let late = queue.submit("translation", |_lease| async { Ok::<_, String>(9) });
    assert_eq!(late.await, Err(ResourceError::QueueClosed));
    assert!(queue.is_closed());
}

#[test]
fn submission_outside_a_runtime_reports_the_missing_runtime() {
    let (queue, loader) = queue(1_000);
    let submission = queue.submit("translation", |_lease| async { Ok::<_, String>(()) });
    assert_eq!(queue.pending(), 0);
    assert!(!queue.is_draining());

    let executor = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let err = executor.block_on(submission).unwrap_err();

    assert_eq!(err, ResourceError::NoAsyncRuntime(ResourceId::new("translation")));
    assert_eq!(err.resource(), Some(&ResourceId::new("translation")));
    assert!(!err.is_retryable());
    assert_eq!(loader.loads(), 0);
}
