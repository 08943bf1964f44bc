//! Progress tracking for a search run

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of a run's progress
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Candidates fully checked so far
    pub checked: u64,
    /// Matches found so far
    pub matches: u64,
    /// Checking rate in candidates per second
    pub rate: f64,
    /// Elapsed wall-clock time
    pub elapsed: Duration,
}

/// Shared, thread-safe progress monitor fed by the checker workers
#[derive(Debug)]
pub struct SearchMonitor {
    checked: AtomicU64,
    matches: AtomicU64,
    started: Instant,
    bar: Option<ProgressBar>,
}

impl SearchMonitor {
    /// Create a monitor; `show_bar` draws an interactive progress bar sized
    /// to the full candidate space
    pub fn new(total_candidates: u64, show_bar: bool) -> Self {
        let bar = if show_bar {
            let pb = ProgressBar::new(total_candidates);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}) {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            pb.set_message("searching");
            Some(pb)
        } else {
            None
        };

        Self {
            checked: AtomicU64::new(0),
            matches: AtomicU64::new(0),
            started: Instant::now(),
            bar,
        }
    }

    /// Record fully checked candidates
    pub fn record_checked(&self, count: u64) {
        self.checked.fetch_add(count, Ordering::Relaxed);
        if let Some(bar) = &self.bar {
            bar.inc(count);
        }
    }

    /// Record a found match
    pub fn record_match(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Candidates fully checked so far
    pub fn checked(&self) -> u64 {
        self.checked.load(Ordering::Relaxed)
    }

    /// Current progress snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        let checked = self.checked();
        let elapsed = self.started.elapsed();
        let rate = if elapsed.as_secs_f64() > 0.0 {
            checked as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        ProgressSnapshot {
            checked,
            matches: self.matches.load(Ordering::Relaxed),
            rate,
            elapsed,
        }
    }

    /// Tear down the progress bar
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let monitor = SearchMonitor::new(100, false);
        monitor.record_checked(3);
        monitor.record_checked(2);
        monitor.record_match();

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.checked, 5);
        assert_eq!(snapshot.matches, 1);
    }
}
