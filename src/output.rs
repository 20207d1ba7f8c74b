//! Safe output file
//!
//! The manifest is written to a temporary file next to the destination and
//! renamed into place by [`SafeFile::commit`]. Dropping an uncommitted
//! `SafeFile` deletes the temporary file and leaves any existing destination
//! untouched.

use crate::error::OutputError;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use tracing::debug;

/// Output file that only appears at its destination on commit
#[derive(Debug)]
pub struct SafeFile {
    temp: NamedTempFile,
    dest: PathBuf,
}

impl SafeFile {
    /// Create a temporary file alongside `dest`
    ///
    /// Fails with [`OutputError::Exists`] if `dest` exists and `force` is
    /// not set.
    pub fn create(dest: &Path, force: bool) -> Result<Self, OutputError> {
        if !force && dest.symlink_metadata().is_ok() {
            return Err(OutputError::Exists {
                path: dest.to_path_buf(),
            });
        }

        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let temp = Builder::new()
            .prefix(".ghash-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| OutputError::Create {
                path: dest.to_path_buf(),
                source,
            })?;

        debug!(temp = %temp.path().display(), dest = %dest.display(), "Output file staged");

        Ok(Self {
            temp,
            dest: dest.to_path_buf(),
        })
    }

    /// Flush, sync and rename into place
    pub fn commit(self) -> Result<PathBuf, OutputError> {
        let Self { mut temp, dest } = self;
        let commit_err = |source| OutputError::Commit {
            path: dest.clone(),
            source,
        };

        temp.flush().map_err(commit_err)?;
        temp.as_file().sync_all().map_err(commit_err)?;
        temp.persist(&dest).map_err(|e| commit_err(e.error))?;

        debug!(dest = %dest.display(), "Output file committed");
        Ok(dest)
    }

    /// Discard the temporary file
    pub fn abort(self) {
        debug!(dest = %self.dest.display(), "Output file discarded");
    }

    fn file(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }
}

impl Write for SafeFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file().flush()
    }
}
