use mmpjobs::{Clock, ErrorSink, JobQueue, LogErrorSink, ManualClock, Step};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sink de test qui mémorise les noms des jobs en erreur
#[derive(Default)]
struct RecordingSink {
    failures: Mutex<Vec<(String, String)>>,
}

impl ErrorSink for RecordingSink {
    fn on_error(&self, job_name: &str, error: &anyhow::Error) {
        self.failures
            .lock()
            .unwrap()
            .push((job_name.to_string(), error.to_string()));
    }
}

fn counting_action(
    count: &Arc<AtomicUsize>,
    retire: bool,
) -> impl FnMut() -> anyhow::Result<bool> + Send + 'static {
    let count = count.clone();
    move || {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(retire)
    }
}

#[test]
fn test_retiring_job_runs_exactly_once() {
    let queue = JobQueue::new(Arc::new(LogErrorSink));
    let count = Arc::new(AtomicUsize::new(0));
    let handle = queue.submit("Add results from Soma", counting_action(&count, true), None);

    assert_eq!(queue.run_once(Instant::now()), Step::Retired(handle.clone()));
    for _ in 0..5 {
        assert_eq!(queue.run_once(Instant::now()), Step::Idle);
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!queue.contains(&handle));
}

#[test]
fn test_failing_job_reported_once_and_dropped() {
    let sink = Arc::new(RecordingSink::default());
    let queue = JobQueue::new(sink.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = calls.clone();

    let handle = queue.submit(
        "Download",
        move || {
            inner.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("connection reset")
        },
        None,
    );

    assert_eq!(queue.run_once(Instant::now()), Step::Failed(handle));
    assert_eq!(queue.run_once(Instant::now()), Step::Idle);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let failures = sink.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "Download");
    assert_eq!(failures[0].1, "connection reset");
}

#[test]
fn test_panicking_job_does_not_poison_the_queue() {
    let sink = Arc::new(RecordingSink::default());
    let queue = JobQueue::new(sink.clone());
    let count = Arc::new(AtomicUsize::new(0));

    queue.submit("Broken", || -> anyhow::Result<bool> { panic!("boom") }, None);
    queue.submit("Healthy", counting_action(&count, false), None);

    assert!(matches!(queue.run_once(Instant::now()), Step::Failed(_)));
    assert!(matches!(queue.run_once(Instant::now()), Step::Ran(_)));
    assert!(matches!(queue.run_once(Instant::now()), Step::Ran(_)));

    assert_eq!(count.load(Ordering::SeqCst), 2);
    let failures = sink.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "Broken");
    assert!(failures[0].1.contains("boom"));
}

#[test]
fn test_interval_throttling() {
    let clock = ManualClock::new();
    let queue = JobQueue::new(Arc::new(LogErrorSink)).with_clock(Arc::new(clock.clone()));
    let runs = Arc::new(Mutex::new(Vec::new()));
    let inner = runs.clone();
    let inner_clock = clock.clone();

    queue.submit(
        "Update Lyrics",
        move || {
            inner.lock().unwrap().push(inner_clock.elapsed().as_secs());
            Ok(false)
        },
        Some(Duration::from_secs(5)),
    );

    for t in 0..=6 {
        clock.set_elapsed(Duration::from_secs(t));
        queue.run_once(clock.now());
    }

    assert_eq!(*runs.lock().unwrap(), vec![0, 5]);
}

#[test]
fn test_worker_runs_jobs_until_stopped() {
    let queue = JobQueue::new(Arc::new(LogErrorSink)).with_idle_poll(Duration::from_millis(5));
    let worker = queue.start().unwrap();
    assert!(queue.is_running());
    assert!(queue.start().is_err(), "a second worker must be refused");

    let (tx, rx) = crossbeam_channel::unbounded();
    queue.submit_once("ping", move || {
        tx.send("pong").unwrap();
        Ok(())
    });
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "pong");

    queue.stop();
    worker.join().unwrap();
    assert!(!queue.is_running());
}

#[test]
fn test_blocking_action_stalls_every_other_job() {
    let queue = JobQueue::new(Arc::new(LogErrorSink)).with_idle_poll(Duration::from_millis(1));
    let spans: Arc<Mutex<Vec<(&'static str, Instant, Instant)>>> = Arc::new(Mutex::new(Vec::new()));

    let tick_spans = spans.clone();
    queue.submit(
        "tick",
        move || {
            let start = Instant::now();
            tick_spans.lock().unwrap().push(("tick", start, Instant::now()));
            Ok(false)
        },
        Some(Duration::from_millis(5)),
    );

    let download_spans = spans.clone();
    queue.submit_once("download", move || {
        let start = Instant::now();
        std::thread::sleep(Duration::from_millis(150));
        download_spans
            .lock()
            .unwrap()
            .push(("download", start, Instant::now()));
        Ok(())
    });

    let worker = queue.start().unwrap();
    std::thread::sleep(Duration::from_millis(400));
    queue.stop();
    worker.join().unwrap();

    let spans = spans.lock().unwrap();
    let (_, dl_start, dl_end) = *spans
        .iter()
        .find(|(name, _, _)| *name == "download")
        .expect("download ran");

    let ticks: Vec<_> = spans.iter().filter(|(name, _, _)| *name == "tick").collect();
    assert!(ticks.len() >= 2, "tick job kept running around the download");
    for (_, start, end) in ticks {
        let overlaps = *start < dl_end && *end > dl_start;
        assert!(!overlaps, "no tick may run while the download blocks the worker");
    }
}
