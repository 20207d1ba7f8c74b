//! Progress reporting for hashing and verification runs
//!
//! Provides a live spinner using indicatif, refreshed from the shared
//! [`RunStats`] counters by a small ticker thread. Everything is drawn on
//! stderr so a manifest on stdout stays clean.

use crate::walker::RunStats;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::warn;

/// Refresh interval for the spinner
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Point-in-time view of a run
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Files hashed so far
    pub files: u64,

    /// Bytes hashed so far
    pub bytes: u64,

    /// Errors reported so far
    pub errors: u64,

    /// Tasks queued by the producer
    pub queued: u64,

    /// Elapsed time
    pub elapsed: Duration,
}

impl RunProgress {
    pub fn capture(stats: &RunStats, elapsed: Duration) -> Self {
        Self {
            files: stats.files(),
            bytes: stats.bytes(),
            errors: stats.errors(),
            queued: stats.queued(),
            elapsed,
        }
    }

    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }

    /// Calculate bytes per second rate
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }

    fn message(&self) -> String {
        format!(
            "Files: {}/{} | Size: {} | Rate: {:.0}/s, {}/s | Errors: {}",
            format_number(self.files),
            format_number(self.queued),
            format_size(self.bytes, BINARY),
            self.files_per_second(),
            format_size(self.bytes_per_second() as u64, BINARY),
            format_number(self.errors),
        )
    }
}

/// Spinner that follows a run's counters until finished
pub struct ProgressReporter {
    bar: ProgressBar,
    stop: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start displaying progress for `stats`
    pub fn start(stats: Arc<RunStats>) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(spinner_style);
        bar.enable_steady_tick(TICK_INTERVAL);

        let stop = Arc::new(AtomicBool::new(false));
        let ticker = {
            let bar = bar.clone();
            let stop = Arc::clone(&stop);
            let started = Instant::now();

            thread::Builder::new()
                .name("progress".into())
                .spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        bar.set_message(RunProgress::capture(&stats, started.elapsed()).message());
                        thread::sleep(TICK_INTERVAL);
                    }
                })
                .map_err(|e| warn!(error = %e, "Progress display unavailable"))
                .ok()
        };

        Self { bar, stop, ticker }
    }

    /// Stop the ticker and clear the spinner
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }
        self.bar.finish_and_clear();
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print an end-of-run summary on stderr
pub fn print_summary(title: &str, files: u64, bytes: u64, errors: usize, duration: Duration) {
    let duration_secs = duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        files as f64 / duration_secs
    } else {
        0.0
    };

    eprintln!();
    if errors == 0 {
        eprintln!("{}", style(title).green().bold());
    } else {
        eprintln!("{}", style(title).yellow().bold());
    }
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Files:").bold(), format_number(files));
    eprintln!("  {} {}", style("Total Size:").bold(), format_size(bytes, BINARY));
    eprintln!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if errors > 0 {
        eprintln!(
            "  {} {}",
            style("Errors:").red().bold(),
            format_number(errors as u64)
        );
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_run_progress_rates() {
        let stats = RunStats::default();
        for _ in 0..100 {
            stats.record_file(1024);
        }
        stats.record_error();

        let progress = RunProgress::capture(&stats, Duration::from_secs(10));
        assert_eq!(progress.files, 100);
        assert_eq!(progress.errors, 1);
        assert!((progress.files_per_second() - 10.0).abs() < 0.01);
        assert!((progress.bytes_per_second() - 10240.0).abs() < 0.01);
        assert!(progress.message().contains("Errors: 1"));
    }

    #[test]
    fn test_zero_elapsed() {
        let progress = RunProgress::capture(&RunStats::default(), Duration::ZERO);
        assert_eq!(progress.files_per_second(), 0.0);
    }

    #[test]
    fn test_reporter_start_finish() {
        let stats = Arc::new(RunStats::default());
        let reporter = ProgressReporter::start(Arc::clone(&stats));
        stats.record_file(10);
        reporter.finish();
    }
}
