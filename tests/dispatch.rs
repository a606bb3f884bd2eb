//! Worker pool dispatch tests

use soundboy::analysis::SoundAnalyzer;
use soundboy::model::{AnalysisOutcome, SoundFile, SoundMetadata, SoundQuery};
use soundboy::pool::{BatchEvent, CancelToken, WorkerPool};
use soundboy::store::{MemoryStore, SoundStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Fails on configured paths, sleeps on every file and records how many
/// analyses overlap
struct ProbeAnalyzer {
    failing: HashSet<PathBuf>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ProbeAnalyzer {
    fn new(failing: &[&str], delay: Duration) -> Self {
        Self {
            failing: failing.iter().map(PathBuf::from).collect(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl SoundAnalyzer for ProbeAnalyzer {
    fn analyze(&self, audio_path: &Path) -> anyhow::Result<SoundMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        thread::sleep(self.delay);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(audio_path) {
            anyhow::bail!("unsupported encoding");
        }
        Ok(SoundMetadata::for_file(audio_path, 42))
    }
}

fn batch(count: usize) -> Vec<SoundFile> {
    (0..count)
        .map(|i| SoundFile::new(format!("/library/sound_{:03}.wav", i)))
        .collect()
}

#[test]
fn test_every_file_settles_once_then_completes() {
    let files = batch(20);
    let failing = ["/library/sound_003.wav", "/library/sound_011.wav", "/library/sound_017.wav"];
    let analyzer = Arc::new(ProbeAnalyzer::new(&failing, Duration::from_millis(2)));
    let store = Arc::new(MemoryStore::new());
    let pool = WorkerPool::new(4, analyzer.clone(), store.clone()).unwrap();

    let outcomes = Mutex::new(Vec::new());
    let completions = AtomicUsize::new(0);
    let outcomes_at_completion = AtomicUsize::new(usize::MAX);

    let summary = pool.dispatch(
        files.clone(),
        &CancelToken::new(),
        |outcome| outcomes.lock().unwrap().push(outcome),
        |summary| {
            completions.fetch_add(1, Ordering::SeqCst);
            outcomes_at_completion.store(outcomes.lock().unwrap().len(), Ordering::SeqCst);
            assert_eq!(summary.settled(), 20);
        },
    );

    let outcomes = outcomes.into_inner().unwrap();
    assert_eq!(outcomes.len(), 20);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    // Completion observed every outcome already delivered
    assert_eq!(outcomes_at_completion.load(Ordering::SeqCst), 20);

    let seen: HashSet<PathBuf> = outcomes.iter().map(|o| o.file_path().to_path_buf()).collect();
    let expected: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(seen, expected);

    let failed: HashSet<PathBuf> = outcomes
        .iter()
        .filter(|o| !o.is_success())
        .map(|o| o.file_path().to_path_buf())
        .collect();
    let expected_failures: HashSet<PathBuf> = failing.iter().map(PathBuf::from).collect();
    assert_eq!(failed, expected_failures);

    assert_eq!(summary.succeeded, 17);
    assert_eq!(summary.failed, 3);
    assert_eq!(store.query(&SoundQuery::all()).unwrap().len(), 17);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 20);
}

#[test]
fn test_concurrency_never_exceeds_pool_size() {
    let analyzer = Arc::new(ProbeAnalyzer::new(&[], Duration::from_millis(15)));
    let pool = WorkerPool::new(3, analyzer.clone(), Arc::new(MemoryStore::new())).unwrap();

    pool.dispatch(batch(12), &CancelToken::new(), |_| {}, |_| {});

    let max = analyzer.max_in_flight.load(Ordering::SeqCst);
    assert!(max >= 1);
    assert!(max <= 3, "saw {} concurrent analyses with 3 workers", max);
}

#[test]
fn test_pool_is_reused_across_batches() {
    let analyzer = Arc::new(ProbeAnalyzer::new(&[], Duration::from_millis(1)));
    let store = Arc::new(MemoryStore::new());
    let pool = WorkerPool::new(2, analyzer.clone(), store.clone()).unwrap();

    let first = pool.dispatch(batch(5), &CancelToken::new(), |_| {}, |_| {});
    let second = pool.dispatch(batch(7), &CancelToken::new(), |_| {}, |_| {});

    assert_eq!(first.succeeded, 5);
    assert_eq!(second.succeeded, 7);
    assert_eq!(store.len(), 12);
}

#[test]
fn test_empty_batch_completes_immediately() {
    let pool = WorkerPool::new(
        2,
        Arc::new(ProbeAnalyzer::new(&[], Duration::ZERO)),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    let completions = AtomicUsize::new(0);

    let summary = pool.dispatch(
        Vec::new(),
        &CancelToken::new(),
        |_| panic!("no outcome expected"),
        |_| {
            completions.fetch_add(1, Ordering::SeqCst);
        },
    );

    assert_eq!(summary.total, 0);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_mid_batch_still_reports_every_file() {
    let analyzer = Arc::new(ProbeAnalyzer::new(&[], Duration::from_millis(20)));
    let pool = Arc::new(WorkerPool::new(1, analyzer.clone(), Arc::new(MemoryStore::new())).unwrap());
    let cancel = CancelToken::new();

    let mut rx = pool.dispatch_to_channel(batch(10), cancel.clone()).unwrap();

    let mut outcomes = Vec::new();
    let mut summary = None;
    while let Some(event) = rx.blocking_recv() {
        match event {
            BatchEvent::Outcome(outcome) => {
                if outcomes.is_empty() {
                    cancel.cancel();
                }
                outcomes.push(outcome);
            }
            BatchEvent::Complete(done) => summary = Some(done),
        }
    }

    assert_eq!(outcomes.len(), 10);
    let summary = summary.unwrap();
    assert_eq!(summary.settled(), 10);
    assert!(summary.failed >= 1);

    let cancelled = outcomes
        .iter()
        .filter(|o| matches!(o, AnalysisOutcome::Failure { error, .. } if error.kind == "cancelled"))
        .count();
    assert_eq!(cancelled, summary.failed);
    assert!(analyzer.calls.load(Ordering::SeqCst) < 10);
}
