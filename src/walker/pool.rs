//! Fixed-size pool of hashing workers
//!
//! Workers pull tasks until the queue is closed and drained. Each task
//! produces either a result line (sent to the single [`ResultSink`]), a bare
//! completion, or an [`ErrorRecord`] for the harvester. Nothing is retried
//! and a failed task never stops the pool.

use crate::error::{ErrorRecord, WorkerError};
use crate::walker::harvester::ErrorSink;
use crate::walker::queue::WorkQueueReceiver;
use crate::walker::writer::ResultSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Counters shared by the producer, the workers and the progress display
#[derive(Debug, Default)]
pub struct RunStats {
    /// Files hashed successfully
    pub files: AtomicU64,

    /// Bytes read by the hasher
    pub bytes: AtomicU64,

    /// Error records reported
    pub errors: AtomicU64,

    /// Tasks handed to the queue by the producer
    pub queued: AtomicU64,
}

impl RunStats {
    pub fn record_file(&self, bytes: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }
}

/// What a job produced for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// A manifest line for the result sink
    Line { line: String, bytes: u64 },

    /// Task finished with nothing to write
    Done { bytes: u64 },
}

/// Pool of symmetric worker threads
#[derive(Debug)]
pub struct WorkerPool {
    worker_count: usize,
    stats: Arc<RunStats>,
}

impl WorkerPool {
    pub fn new(worker_count: usize, stats: Arc<RunStats>) -> Self {
        Self {
            worker_count: worker_count.max(1),
            stats,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn stats(&self) -> &Arc<RunStats> {
        &self.stats
    }

    /// Run `job` over every task until the queue is exhausted
    ///
    /// Returns once every worker has stopped, so callers may close the
    /// error stream afterwards without losing in-flight records.
    pub fn run<T, F>(
        &self,
        tasks: WorkQueueReceiver<T>,
        errors: &ErrorSink,
        sink: Option<&ResultSink>,
        job: F,
    ) -> Result<(), WorkerError>
    where
        T: Send,
        F: Fn(T) -> Result<JobOutcome, ErrorRecord> + Sync,
    {
        let job = &job;
        let stats = &self.stats;

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.worker_count);
            let mut spawn_error = None;

            for id in 0..self.worker_count {
                let rx = tasks.clone();
                let errors = errors.clone();
                let sink = sink.cloned();

                let spawned = thread::Builder::new()
                    .name(format!("hasher-{}", id))
                    .spawn_scoped(s, move || {
                        worker_loop(id, rx, &errors, sink.as_ref(), stats, job)
                    });

                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(e) => {
                        spawn_error = Some(WorkerError::InitFailed {
                            role: "hasher",
                            id,
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }

            // Workers hold their own clones; the queue closes for the
            // producer once they are all gone.
            drop(tasks);
            debug!(count = handles.len(), "Hash workers spawned");

            let mut first_error = spawn_error;
            for (id, handle) in handles {
                let result = match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(WorkerError::Panicked { role: "hasher", id }),
                };
                if let Err(e) = result {
                    warn!(worker = id, error = %e, "Worker failed");
                    first_error.get_or_insert(e);
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }
}

fn worker_loop<T, F>(
    id: usize,
    tasks: WorkQueueReceiver<T>,
    errors: &ErrorSink,
    sink: Option<&ResultSink>,
    stats: &RunStats,
    job: &F,
) -> Result<(), WorkerError>
where
    F: Fn(T) -> Result<JobOutcome, ErrorRecord>,
{
    let mut processed = 0u64;

    while let Some(task) = tasks.recv() {
        processed += 1;
        match job(task) {
            Ok(JobOutcome::Line { line, bytes }) => {
                stats.record_file(bytes);
                if let Some(sink) = sink {
                    sink.write_line(line)?;
                }
            }
            Ok(JobOutcome::Done { bytes }) => stats.record_file(bytes),
            Err(record) => errors.report(record),
        }
    }

    debug!(worker = id, processed, "Worker finished");
    Ok(())
}
