//! Hash coordinator - orchestrates manifest generation
//!
//! The coordinator is responsible for:
//! - Writing the manifest header
//! - Starting the error harvester and the manifest writer
//! - Running the enumerator as the producer of the bounded work queue
//! - Running the worker pool over that queue
//! - Tearing everything down in order: producer and workers first, then
//!   the writer, then the harvester
//! - Final statistics

use crate::error::{ConfigError, ErrorRecord, ErrorReport, Result, WorkerError};
use crate::hash::{hash_file, HasherFactory};
use crate::manifest::{encode_entry, ManifestHeader};
use crate::walker::enumerator::{EnumerateOptions, Enumerator};
use crate::walker::harvester::ErrorHarvester;
use crate::walker::pool::{JobOutcome, RunStats, WorkerPool};
use crate::walker::queue::{FileTask, WorkQueue};
use crate::walker::writer::ResultWriter;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, trace};

/// Settings for one generation run
#[derive(Debug, Clone)]
pub struct HashOptions {
    /// Command-line roots
    pub roots: Vec<PathBuf>,

    /// Number of hashing workers (also the work queue capacity)
    pub worker_count: usize,

    /// Version string recorded in the header
    pub version: String,

    pub enumerate: EnumerateOptions,
}

/// Result of a completed generation run
#[derive(Debug)]
pub struct HashResult {
    /// Files hashed and written to the manifest
    pub files_hashed: u64,

    /// Bytes read while hashing
    pub bytes_hashed: u64,

    /// Every non-fatal error, in arrival order
    pub errors: ErrorReport,

    /// Time taken for the run
    pub duration: Duration,
}

impl HashResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Coordinates enumeration, hashing and manifest output
pub struct HashCoordinator {
    options: HashOptions,
    factory: Arc<dyn HasherFactory>,
    stats: Arc<RunStats>,
}

impl HashCoordinator {
    /// Create a coordinator, checking that the factory can produce a hasher
    pub fn new(options: HashOptions, factory: Arc<dyn HasherFactory>) -> Result<Self> {
        if factory.new_hasher().is_none() {
            return Err(ConfigError::HasherUnavailable {
                name: factory.name().to_string(),
            }
            .into());
        }

        Ok(Self {
            options,
            factory,
            stats: Arc::new(RunStats::default()),
        })
    }

    /// Shared counters, for progress display
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Run the pipeline, writing the manifest to `out`
    ///
    /// Returns the output back so the caller can decide whether to keep it.
    pub fn run<W>(self, mut out: W) -> Result<(HashResult, W)>
    where
        W: Write + Send + 'static,
    {
        let start_time = Instant::now();
        let workers = self.options.worker_count.max(1);

        info!(
            algorithm = self.factory.name(),
            roots = self.options.roots.len(),
            workers,
            recurse = self.options.enumerate.recurse,
            follow_symlinks = self.options.enumerate.follow_symlinks,
            "Starting hash run"
        );

        let header = ManifestHeader::new(self.factory.name(), self.options.version.as_str());
        writeln!(out, "{}", header.encode())?;

        let harvester = ErrorHarvester::spawn(workers, Arc::clone(&self.stats))?;
        let writer = ResultWriter::spawn(out, workers * 2)?;
        let pool = WorkerPool::new(workers, Arc::clone(&self.stats));
        let enumerator = Enumerator::new(self.options.enumerate);
        let (tasks_tx, tasks_rx) = WorkQueue::new(workers).split();

        let errors = harvester.sink();
        let sink = writer.sink();
        let factory = self.factory.as_ref();
        let roots = &self.options.roots;
        let stats = &self.stats;

        let pool_result = thread::scope(|s| -> std::result::Result<(), WorkerError> {
            let producer_errors = errors.clone();
            let producer = thread::Builder::new()
                .name("enumerator".into())
                .spawn_scoped(s, move || {
                    enumerator.run(roots, &tasks_tx, &producer_errors, stats)
                })
                .map_err(|e| WorkerError::InitFailed {
                    role: "enumerator",
                    id: 0,
                    reason: e.to_string(),
                })?;

            let pooled = pool.run(tasks_rx, &errors, Some(&sink), |task| hash_task(task, factory));

            let produced = match producer.join() {
                Ok(result) => result.map(|_| ()),
                Err(_) => Err(WorkerError::Panicked {
                    role: "enumerator",
                    id: 0,
                }),
            };

            pooled.and(produced)
        });

        // Producer and workers are joined; the writer and the harvester can
        // now see their streams close.
        drop(sink);
        drop(errors);
        let out = writer.finish()?;
        let report = harvester.finish()?;
        pool_result?;

        let duration = start_time.elapsed();
        let result = HashResult {
            files_hashed: self.stats.files(),
            bytes_hashed: self.stats.bytes(),
            errors: report,
            duration,
        };

        info!(
            files = result.files_hashed,
            bytes = result.bytes_hashed,
            errors = result.errors.len(),
            duration_ms = duration.as_millis() as u64,
            "Hash run completed"
        );

        Ok((result, out))
    }
}

/// Hash one file into a manifest line
fn hash_task(
    task: FileTask,
    factory: &dyn HasherFactory,
) -> std::result::Result<JobOutcome, ErrorRecord> {
    let digest = hash_file(&task.path, factory).map_err(|e| {
        ErrorRecord::new(task.path.display().to_string(), format!("can't hash: {}", e))
    })?;

    trace!(path = %task.path.display(), bytes = digest.byte_count, "Hashed");

    Ok(JobOutcome::Line {
        line: encode_entry(&digest.to_hex(), digest.byte_count, &task.path),
        bytes: digest.byte_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Algorithm, DigestHasher};
    use crate::manifest::decode_entry;
    use std::fs;
    use tempfile::tempdir;

    fn options(roots: Vec<PathBuf>, workers: usize) -> HashOptions {
        HashOptions {
            roots,
            worker_count: workers,
            version: "0.1.0".into(),
            enumerate: EnumerateOptions::default(),
        }
    }

    #[test]
    fn test_generate_manifest() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b c");
        fs::write(&a, b"abc").unwrap();
        fs::write(&b, b"").unwrap();

        let factory: Arc<dyn HasherFactory> = Arc::new(Algorithm::Sha256);
        let coordinator =
            HashCoordinator::new(options(vec![a.clone(), b.clone()], 3), factory).unwrap();
        let (result, out) = coordinator.run(Vec::new()).unwrap();

        assert!(result.is_success());
        assert_eq!(result.files_hashed, 2);
        assert_eq!(result.bytes_hashed, 3);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("#!ghash sha256 0.1.0"));

        let mut entries: Vec<_> = lines.map(|l| decode_entry(l).unwrap()).collect();
        entries.sort_by(|x, y| x.path.cmp(&y.path));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, a);
        assert_eq!(
            entries[0].expected_digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(entries[1].path, b);
        assert_eq!(entries[1].expected_size, 0);
    }

    #[test]
    fn test_errors_collected_and_run_completes() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good");
        fs::write(&good, b"x").unwrap();
        let missing = dir.path().join("missing");

        let factory: Arc<dyn HasherFactory> = Arc::new(Algorithm::Blake3);
        let coordinator =
            HashCoordinator::new(options(vec![missing, dir.path().to_path_buf(), good], 2), factory)
                .unwrap();
        let (result, out) = coordinator.run(Vec::new()).unwrap();

        assert_eq!(result.files_hashed, 1);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_unreadable_file_dropped_from_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::write(&locked, b"secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root can read anything
        if fs::File::open(&locked).is_ok() {
            return;
        }

        let factory: Arc<dyn HasherFactory> = Arc::new(Algorithm::Sha512);
        let coordinator = HashCoordinator::new(options(vec![locked], 1), factory).unwrap();
        let (result, out) = coordinator.run(Vec::new()).unwrap();

        assert_eq!(result.files_hashed, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors.records()[0].message.starts_with("can't hash: "));
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    struct Unavailable;

    impl HasherFactory for Unavailable {
        fn name(&self) -> &str {
            "broken"
        }

        fn new_hasher(&self) -> Option<Box<dyn DigestHasher>> {
            None
        }
    }

    #[test]
    fn test_unavailable_hasher_rejected_at_startup() {
        let result = HashCoordinator::new(options(vec![], 1), Arc::new(Unavailable));
        assert!(matches!(
            result,
            Err(crate::error::GhashError::Config(ConfigError::HasherUnavailable { .. }))
        ));
    }
}
