//! Manifest verification
//!
//! The header is read and validated on the calling thread; a bad magic token
//! or an unknown algorithm aborts before any worker starts. The remaining
//! lines are decoded by a `manifest-reader` producer and checked by the
//! worker pool:
//!
//! 1. `stat` the path; missing, not a regular file, or a different size
//!    fails without hashing
//! 2. hash the file; a byte count that differs from the recorded size means
//!    the file changed while it was read
//! 3. compare hex digests in constant time
//!
//! Every failure becomes an [`ErrorRecord`] tagged `<manifest>: <line>`, with
//! the header on line 1.

use crate::error::{
    ConfigError, ErrorRecord, ErrorReport, LineError, ManifestError, Result, VerifyFailure,
    WorkerError,
};
use crate::hash::{hash_file, Algorithm, HasherFactory};
use crate::manifest::{decode_entry, HeaderError, ManifestEntry, ManifestHeader};
use crate::walker::harvester::{ErrorHarvester, ErrorSink};
use crate::walker::pool::{JobOutcome, RunStats, WorkerPool};
use crate::walker::queue::{WorkQueue, WorkQueueSender};
use std::fs;
use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tracing::{debug, info, trace};

/// One decoded manifest line awaiting verification
#[derive(Debug, Clone)]
pub struct VerifyTask {
    pub entry: ManifestEntry,

    /// 1-based line number in the manifest
    pub line: usize,
}

/// Result of a completed verification run
#[derive(Debug)]
pub struct VerifyResult {
    /// Algorithm named by the manifest header
    pub algorithm: Algorithm,

    /// Files whose digest matched
    pub files_verified: u64,

    /// Bytes hashed
    pub bytes_hashed: u64,

    /// Every mismatch and malformed line
    pub errors: ErrorReport,

    pub duration: Duration,
}

impl VerifyResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Re-hashes the files listed in a manifest
pub struct Verifier {
    worker_count: usize,
    stats: Arc<RunStats>,
}

impl Verifier {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            stats: Arc::new(RunStats::default()),
        }
    }

    /// Shared counters, for progress display
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Verify every entry read from `reader`
    ///
    /// `source_name` prefixes every error record.
    pub fn run<R>(self, source_name: &str, mut reader: R) -> Result<VerifyResult>
    where
        R: BufRead + Send,
    {
        let start_time = Instant::now();
        let (header, algorithm) = read_header(source_name, &mut reader)?;

        if algorithm.new_hasher().is_none() {
            return Err(ConfigError::HasherUnavailable {
                name: algorithm.name().to_string(),
            }
            .into());
        }

        info!(
            manifest = source_name,
            algorithm = %algorithm,
            written_by = %header.version,
            workers = self.worker_count,
            "Starting verification"
        );

        let harvester = ErrorHarvester::spawn(self.worker_count, Arc::clone(&self.stats))?;
        let pool = WorkerPool::new(self.worker_count, Arc::clone(&self.stats));
        let (tasks_tx, tasks_rx) = WorkQueue::new(self.worker_count).split();
        let errors = harvester.sink();
        let stats = &self.stats;
        let digest_width = algorithm.digest_len() * 2;

        let pool_result = thread::scope(|s| -> std::result::Result<(), WorkerError> {
            let producer_errors = errors.clone();
            let producer = thread::Builder::new()
                .name("manifest-reader".into())
                .spawn_scoped(s, move || {
                    read_entries(
                        source_name,
                        reader,
                        digest_width,
                        &tasks_tx,
                        &producer_errors,
                        stats,
                    )
                })
                .map_err(|e| WorkerError::InitFailed {
                    role: "manifest-reader",
                    id: 0,
                    reason: e.to_string(),
                })?;

            let pooled = pool.run(tasks_rx, &errors, None, |task| {
                verify_entry(source_name, task, &algorithm)
            });

            let produced = producer.join().unwrap_or(Err(WorkerError::Panicked {
                role: "manifest-reader",
                id: 0,
            }));

            pooled.and(produced)
        });

        drop(errors);
        let report = harvester.finish()?;
        pool_result?;

        let duration = start_time.elapsed();
        let result = VerifyResult {
            algorithm,
            files_verified: self.stats.files(),
            bytes_hashed: self.stats.bytes(),
            errors: report,
            duration,
        };

        info!(
            verified = result.files_verified,
            errors = result.errors.len(),
            duration_ms = duration.as_millis() as u64,
            "Verification completed"
        );

        Ok(result)
    }
}

/// Read and validate the header line
pub fn read_header<R: BufRead>(
    source_name: &str,
    reader: &mut R,
) -> std::result::Result<(ManifestHeader, Algorithm), ManifestError> {
    let mut first = String::new();
    match reader.read_line(&mut first) {
        Ok(n) if n > 0 => {}
        _ => {
            return Err(ManifestError::MissingHeader {
                source_name: source_name.to_string(),
            })
        }
    }

    let header = ManifestHeader::parse(trim_line_ending(&first)).map_err(|e| match e {
        HeaderError::TooShort => ManifestError::ShortHeader {
            source_name: source_name.to_string(),
        },
        HeaderError::BadMagic => ManifestError::BadMagic {
            source_name: source_name.to_string(),
        },
    })?;

    let algorithm =
        Algorithm::from_name(&header.algorithm).ok_or_else(|| ManifestError::UnknownAlgorithm {
            source_name: source_name.to_string(),
            algorithm: header.algorithm.clone(),
        })?;

    Ok((header, algorithm))
}

/// Producer: decode lines 2.. onto the work queue
///
/// Digests must be exactly `digest_width` hex characters.
fn read_entries<R: BufRead>(
    source_name: &str,
    reader: R,
    digest_width: usize,
    tasks: &WorkQueueSender<VerifyTask>,
    errors: &ErrorSink,
    stats: &RunStats,
) -> std::result::Result<(), WorkerError> {
    for (idx, raw) in reader.split(b'\n').enumerate() {
        let line = idx + 2;

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                errors.report(ErrorRecord::at_line(
                    source_name,
                    line,
                    format!("can't read: {}", e),
                ));
                break;
            }
        };

        let entry = std::str::from_utf8(&raw)
            .map_err(|_| LineError::NotUtf8)
            .and_then(|text| decode_entry(trim_line_ending(text)))
            .and_then(|entry| check_digest_width(entry, digest_width));

        match entry {
            Ok(entry) => {
                tasks
                    .send(VerifyTask { entry, line })
                    .map_err(|_| WorkerError::QueueClosed)?;
                stats.record_queued();
            }
            Err(e) => errors.report(ErrorRecord::at_line(source_name, line, e)),
        }
    }

    debug!(manifest = source_name, "Manifest read");
    Ok(())
}

/// Check one entry against the filesystem
fn verify_entry(
    source_name: &str,
    task: VerifyTask,
    factory: &dyn HasherFactory,
) -> std::result::Result<JobOutcome, ErrorRecord> {
    let VerifyTask { entry, line } = task;
    check_entry(&entry, factory)
        .map_err(|failure| ErrorRecord::at_line(source_name, line, failure))
}

fn check_entry(
    entry: &ManifestEntry,
    factory: &dyn HasherFactory,
) -> std::result::Result<JobOutcome, VerifyFailure> {
    let path = &entry.path;

    let meta = fs::metadata(path).map_err(|source| VerifyFailure::Stat {
        path: path.clone(),
        source,
    })?;

    if !meta.is_file() {
        return Err(VerifyFailure::NotAFile { path: path.clone() });
    }

    if meta.len() != entry.expected_size {
        return Err(VerifyFailure::SizeMismatch {
            path: path.clone(),
            expected: entry.expected_size,
            actual: meta.len(),
        });
    }

    let digest = hash_file(path, factory).map_err(|source| VerifyFailure::Hash { source })?;

    if digest.byte_count != entry.expected_size {
        return Err(VerifyFailure::SizeChanged {
            path: path.clone(),
            expected: entry.expected_size,
            actual: digest.byte_count,
        });
    }

    let computed = digest.to_hex();
    let matched: bool = computed
        .as_bytes()
        .ct_eq(entry.expected_digest.as_bytes())
        .into();
    if !matched {
        return Err(VerifyFailure::Modified { path: path.clone() });
    }

    trace!(path = %path.display(), "Verified");
    Ok(JobOutcome::Done {
        bytes: digest.byte_count,
    })
}

fn check_digest_width(
    entry: ManifestEntry,
    width: usize,
) -> std::result::Result<ManifestEntry, LineError> {
    let actual = entry.expected_digest.len();
    if actual != width {
        return Err(LineError::DigestWidth {
            expected: width,
            actual,
        });
    }
    Ok(entry)
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
