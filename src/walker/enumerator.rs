//! Input enumeration
//!
//! Turns the command-line roots into a stream of [`FileTask`]s on the bounded
//! work queue. Each candidate is classified the same way whether it came
//! from the command line or from a recursive walk:
//!
//! - symlink: skipped with a notice, or resolved when following links
//! - directory: skipped with a notice (or descended into with `-r`)
//! - regular file: queued
//! - anything else: skipped with a notice
//!
//! Every notice and failure goes to the error harvester; nothing here is
//! fatal except a work queue whose consumers have all gone away.

use crate::error::{EnumerateError, WorkerError};
use crate::walker::harvester::ErrorSink;
use crate::walker::pool::RunStats;
use crate::walker::queue::{FileInfo, FileTask, WorkQueueSender};
use crate::walker::resolver::{Resolution, SymlinkResolver};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// How inputs are expanded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerateOptions {
    /// Descend into directory roots
    pub recurse: bool,

    /// Do not cross filesystem boundaries while descending
    pub one_filesystem: bool,

    /// Resolve symlinks instead of skipping them
    pub follow_symlinks: bool,
}

/// Producer side of the hashing pipeline
pub struct Enumerator {
    options: EnumerateOptions,
    resolver: SymlinkResolver,
}

impl Enumerator {
    /// Create an enumerator with a fresh seen-set
    pub fn new(options: EnumerateOptions) -> Self {
        Self {
            options,
            resolver: SymlinkResolver::new(),
        }
    }

    /// Enumerate every root, blocking whenever the queue is full
    ///
    /// Returns the number of tasks queued.
    pub fn run(
        &self,
        roots: &[PathBuf],
        tasks: &WorkQueueSender<FileTask>,
        errors: &ErrorSink,
        stats: &RunStats,
    ) -> Result<u64, WorkerError> {
        let mut queued = 0u64;

        for root in roots {
            let meta = match fs::symlink_metadata(root) {
                Ok(meta) => meta,
                Err(source) => {
                    errors.report(
                        EnumerateError::Lstat {
                            path: root.clone(),
                            source,
                        }
                        .into(),
                    );
                    continue;
                }
            };

            if self.options.recurse && meta.is_dir() {
                queued += self.walk(root, tasks, errors, stats)?;
            } else if let Some(task) = self.classify(root, &meta, errors) {
                self.push(task, tasks, stats)?;
                queued += 1;
            }
        }

        debug!(queued, seen = self.resolver.seen().len(), "Enumeration finished");
        Ok(queued)
    }

    /// Descend into `root`; directories themselves are never reported
    fn walk(
        &self,
        root: &Path,
        tasks: &WorkQueueSender<FileTask>,
        errors: &ErrorSink,
        stats: &RunStats,
    ) -> Result<u64, WorkerError> {
        let mut queued = 0u64;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .same_file_system(self.options.one_filesystem)
            .min_depth(1);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    let reason = match e.io_error() {
                        Some(io) => io.to_string(),
                        None => e.to_string(),
                    };
                    errors.report(EnumerateError::Walk { path, reason }.into());
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    errors.report(
                        EnumerateError::Walk {
                            path: entry.path().to_path_buf(),
                            reason: e.to_string(),
                        }
                        .into(),
                    );
                    continue;
                }
            };

            if let Some(task) = self.classify(entry.path(), &meta, errors) {
                self.push(task, tasks, stats)?;
                queued += 1;
            }
        }

        Ok(queued)
    }

    /// Decide what to do with one lstat'ed candidate
    fn classify(&self, path: &Path, meta: &Metadata, errors: &ErrorSink) -> Option<FileTask> {
        let ft = meta.file_type();

        if ft.is_symlink() {
            if !self.options.follow_symlinks {
                errors.report(
                    EnumerateError::SkippedSymlink {
                        path: path.to_path_buf(),
                    }
                    .into(),
                );
                return None;
            }

            return match self.resolver.resolve(path) {
                Ok(Resolution::File { path, info }) => Some(FileTask::new(path, info)),
                Ok(Resolution::Duplicate { first }) => {
                    debug!(
                        path = %path.display(),
                        first = %first.display(),
                        "Duplicate symlink target skipped"
                    );
                    None
                }
                Ok(Resolution::NotRegular { target }) => {
                    debug!(
                        path = %path.display(),
                        target = %target.display(),
                        "Symlink to non-file skipped"
                    );
                    None
                }
                Err(e) => {
                    errors.report(e.into());
                    None
                }
            };
        }

        if ft.is_dir() {
            errors.report(
                EnumerateError::SkippedDir {
                    path: path.to_path_buf(),
                }
                .into(),
            );
            return None;
        }

        if ft.is_file() {
            return Some(FileTask::new(path.to_path_buf(), FileInfo::from_metadata(meta)));
        }

        errors.report(
            EnumerateError::SkippedNonFile {
                path: path.to_path_buf(),
            }
            .into(),
        );
        None
    }

    fn push(
        &self,
        task: FileTask,
        tasks: &WorkQueueSender<FileTask>,
        stats: &RunStats,
    ) -> Result<(), WorkerError> {
        trace!(path = %task.path.display(), size = task.info.size, "Queued");
        tasks.send(task).map_err(|_| WorkerError::QueueClosed)?;
        stats.record_queued();
        Ok(())
    }
}
