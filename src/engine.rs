//! Search pipeline: candidate hand-off queue, checker worker pool, log sink,
//! and the cancellation protocol tying them together

use crate::checker::{AddressChecker, MatchEvidence};
use crate::config::SearchConfig;
use crate::crypto::Derivation;
use crate::error::{FinderError, Result};
use crate::generator::{Candidate, CandidateGenerator};
use crate::logsink::{LogHandle, LogSink};
use crate::monitor::SearchMonitor;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Process-wide cancellation signal
///
/// Set at most once per run and never reset. Relaxed orderings suffice: the
/// flag carries no payload, and everything that does (candidates, evidence,
/// log records) travels over channels, which synchronize on their own.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent; concurrent raises are equivalent to one.
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the flag has been raised
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Final result of a search run
#[derive(Debug)]
pub struct SearchOutcome {
    /// Evidence for the found match, if any
    pub evidence: Option<MatchEvidence>,
    /// Candidates handed to the work queue
    pub candidates_enumerated: u64,
    /// Candidates fully checked by the workers
    pub candidates_checked: u64,
    /// Records written to the result log
    pub log_records: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// The search engine: one enumerator, N checker workers, one log sink
///
/// There is a single code path regardless of parallelism; a single-flow run
/// is simply `workers = 1`.
pub struct SearchEngine<D> {
    config: SearchConfig,
    derivation: Arc<D>,
    stop: StopFlag,
}

impl<D: Derivation + 'static> SearchEngine<D> {
    /// Create an engine over a validated configuration
    pub fn new(config: SearchConfig, derivation: D) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            derivation: Arc::new(derivation),
            stop: StopFlag::new(),
        })
    }

    /// Handle to the run's stop flag, e.g. for an interrupt hook
    ///
    /// An external raise is handled exactly like an internal match signal:
    /// enumeration ceases, buffered candidates are drained, the log sink is
    /// flushed, and `run` returns.
    pub fn stop_handle(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Run the search to completion: a found match, an exhausted space, or a
    /// raised stop flag
    pub fn run(&self, monitor: Arc<SearchMonitor>) -> Result<SearchOutcome> {
        let started = Instant::now();
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        let generator = CandidateGenerator::new(&self.config)?;
        let sink = LogSink::create(&self.config.output)?;

        let (work_tx, work_rx) = bounded::<Candidate>(self.config.work_queue_capacity);
        let (log_tx, log_rx) = bounded::<String>(self.config.log_queue_capacity);
        let (result_tx, result_rx) = unbounded::<Result<MatchEvidence>>();

        // Log sink: drains until the queue is closed and empty, so nothing
        // enqueued before shutdown is lost.
        let sink_stop = self.stop.clone();
        let sink_handle = thread::Builder::new()
            .name("log-sink".to_string())
            .spawn(move || sink.run(log_rx, poll_interval, sink_stop))?;

        // Enumerator: produces until exhausted or stopped, then closes the
        // queue by dropping its sender.
        let enum_stop = self.stop.clone();
        let enum_handle = thread::Builder::new()
            .name("enumerator".to_string())
            .spawn(move || enumerate(generator, work_tx, enum_stop, poll_interval))?;

        // Checker pool
        let checker = Arc::new(AddressChecker::new(
            Arc::clone(&self.derivation),
            &self.config,
            LogHandle::new(log_tx, self.config.verbose),
        ));
        let mut workers = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let checker = Arc::clone(&checker);
            let monitor = Arc::clone(&monitor);
            let stop = self.stop.clone();
            let handle = thread::Builder::new()
                .name(format!("checker-{}", worker_id))
                .spawn(move || {
                    check_worker(
                        worker_id,
                        checker,
                        work_rx,
                        result_tx,
                        monitor,
                        stop,
                        poll_interval,
                    )
                })?;
            workers.push(handle);
        }

        // The engine's own clones must go: workers detect a closed queue via
        // their receivers, and the sink exits only once every log sender
        // (held inside the shared checker) is gone.
        drop(work_rx);
        drop(result_tx);
        drop(checker);

        let candidates_enumerated = enum_handle
            .join()
            .map_err(|_| FinderError::Internal("enumerator thread panicked".to_string()))?;
        for worker in workers {
            worker
                .join()
                .map_err(|_| FinderError::Internal("checker thread panicked".to_string()))?;
        }
        let log_records = sink_handle
            .join()
            .map_err(|_| FinderError::Internal("log sink thread panicked".to_string()))??;

        let mut evidence = None;
        let mut failure = None;
        for result in result_rx.try_iter() {
            match result {
                Ok(e) => {
                    if evidence.is_none() {
                        evidence = Some(e);
                    }
                }
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }
        if evidence.is_none() {
            if let Some(e) = failure {
                return Err(e);
            }
        }

        Ok(SearchOutcome {
            evidence,
            candidates_enumerated,
            candidates_checked: monitor.checked(),
            log_records,
            elapsed: started.elapsed(),
        })
    }
}

/// Enumerator loop: feed the work queue until exhausted or stopped
///
/// A full queue applies backpressure through the bounded send; the timeout
/// only exists so a raised stop flag is observed within one poll interval
/// even while blocked.
fn enumerate(
    mut generator: CandidateGenerator,
    work_tx: Sender<Candidate>,
    stop: StopFlag,
    poll_interval: Duration,
) -> u64 {
    debug!("enumerator started");

    let mut produced = 0u64;
    'outer: while let Some(candidate) = generator.next_candidate() {
        if stop.is_set() {
            break;
        }

        let mut pending = candidate;
        loop {
            match work_tx.send_timeout(pending, poll_interval) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(back)) => {
                    if stop.is_set() {
                        break 'outer;
                    }
                    pending = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => break 'outer,
            }
        }
        produced += 1;
    }

    debug!("enumerator exited after {} candidates", produced);
    produced
}

/// Checker worker loop
///
/// Polls the queue with a timeout so the stop flag is observed within one
/// interval even while idle; an empty-queue timeout is a retry, not an
/// error. A raised flag does not abandon buffered work: candidates already
/// enqueued are still drained and checked (one of them might itself be a
/// match), and the worker exits once the queue is closed and empty, or once
/// it times out on an empty queue with the flag up. The worker that finds a
/// match reports its evidence first and raises the flag second, so the
/// evidence is never lost.
fn check_worker<D: Derivation>(
    worker_id: usize,
    checker: Arc<AddressChecker<D>>,
    work_rx: Receiver<Candidate>,
    result_tx: Sender<Result<MatchEvidence>>,
    monitor: Arc<SearchMonitor>,
    stop: StopFlag,
    poll_interval: Duration,
) {
    debug!("checker worker {} started", worker_id);

    loop {
        match work_rx.recv_timeout(poll_interval) {
            Ok(candidate) => match checker.check(&candidate) {
                Ok(Some(evidence)) => {
                    info!(
                        "match found: {} (mnemonic: {}, passphrase: {})",
                        evidence.address, evidence.phrase, evidence.passphrase
                    );
                    monitor.record_checked(1);
                    monitor.record_match();
                    let _ = result_tx.send(Ok(evidence));
                    stop.set();
                }
                Ok(None) => monitor.record_checked(1),
                Err(e) => {
                    let _ = result_tx.send(Err(e));
                    stop.set();
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                // Empty for a full interval: with the flag up the enumerator
                // has stopped feeding, so there is nothing left to drain.
                if stop.is_set() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("checker worker {} exited", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PathSchemeConfig, SearchConfig, WordSlot};
    use crate::crypto::AddressEncoding;
    use crate::tests::support::FakeDerivation;
    use std::sync::atomic::Ordering as AtomicOrdering;

    fn pipeline_config(dir: &std::path::Path, slots: Vec<Vec<&str>>, targets: Vec<String>) -> SearchConfig {
        let phrase_length = slots.len();
        SearchConfig {
            word_slots: slots
                .into_iter()
                .enumerate()
                .map(|(position, words)| WordSlot {
                    position,
                    words: words.into_iter().map(str::to_string).collect(),
                })
                .collect(),
            phrase_length,
            fixed_phrase: None,
            passphrases: vec![String::new()],
            path_scheme: Some(PathSchemeConfig {
                paths: vec!["m/0".to_string()],
                addresses_per_path: 1,
                encoding: AddressEncoding::Ethereum,
            }),
            account_scheme: None,
            targets,
            workers: 2,
            work_queue_capacity: 4,
            log_queue_capacity: 16,
            poll_interval_ms: 20,
            verbose: false,
            output: crate::config::OutputConfig {
                folder: dir.join("results"),
                file_name: "results.log".to_string(),
                max_file_size: 1024 * 1024,
                backup_count: 2,
            },
        }
    }

    #[test]
    fn test_stop_flag_is_idempotent() {
        let flag = StopFlag::new();
        assert!(!flag.is_set());
        flag.set();
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn test_exhaustion_without_match() {
        let dir = tempfile::tempdir().unwrap();
        let config = pipeline_config(
            dir.path(),
            vec![vec!["a", "b"], vec!["x", "y"]],
            vec!["no-such-address".to_string()],
        );
        let engine = SearchEngine::new(config, FakeDerivation::new()).unwrap();
        let monitor = Arc::new(SearchMonitor::new(4, false));

        let outcome = engine.run(monitor).unwrap();

        assert!(outcome.evidence.is_none());
        assert_eq!(outcome.candidates_enumerated, 4);
        assert_eq!(outcome.candidates_checked, 4);
        assert_eq!(outcome.log_records, 0);
    }

    #[test]
    fn test_match_stops_enumeration_early() {
        let dir = tempfile::tempdir().unwrap();
        // 1024 candidates, the very first one matches. Slow workers keep the
        // small queue full, so enumeration must stop well short of the space
        // once the flag is raised.
        let slots = vec![vec!["a", "b"]; 10];
        let first_phrase = vec!["a"; 10].join(" ");
        let target = FakeDerivation::path_address(&first_phrase, "", "m/0", 0);
        let config = pipeline_config(dir.path(), slots, vec![target]);
        let engine = SearchEngine::new(
            config,
            FakeDerivation::with_delay(Duration::from_millis(5)),
        )
        .unwrap();
        let monitor = Arc::new(SearchMonitor::new(1024, false));

        let outcome = engine.run(monitor).unwrap();

        let evidence = outcome.evidence.expect("match expected");
        assert_eq!(evidence.phrase, first_phrase);
        assert!(outcome.candidates_enumerated < 1024);
    }

    #[test]
    fn test_pre_raised_flag_prevents_work() {
        let dir = tempfile::tempdir().unwrap();
        let config = pipeline_config(
            dir.path(),
            vec![vec!["a", "b"]],
            vec!["no-such-address".to_string()],
        );
        let engine = SearchEngine::new(config, FakeDerivation::new()).unwrap();
        engine.stop_handle().set();
        let monitor = Arc::new(SearchMonitor::new(2, false));

        let outcome = engine.run(monitor).unwrap();

        assert!(outcome.evidence.is_none());
        assert_eq!(outcome.candidates_enumerated, 0);
    }

    #[test]
    fn test_single_worker_flow() {
        let dir = tempfile::tempdir().unwrap();
        let target = FakeDerivation::path_address("b", "", "m/0", 0);
        let mut config = pipeline_config(dir.path(), vec![vec!["a", "b"]], vec![target]);
        config.workers = 1;
        let fake = FakeDerivation::new();
        let counters = fake.counters();
        let engine = SearchEngine::new(config, fake).unwrap();
        let monitor = Arc::new(SearchMonitor::new(2, false));

        let outcome = engine.run(monitor).unwrap();

        let evidence = outcome.evidence.expect("match expected");
        assert_eq!(evidence.phrase, "b");
        assert_eq!(outcome.candidates_enumerated, 2);
        assert_eq!(counters.seed_calls.load(AtomicOrdering::SeqCst), 2);
    }
}
