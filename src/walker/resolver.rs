//! Symlink resolution with loop and duplicate detection
//!
//! [`SymlinkResolver::resolve`] follows a chain of symlinks one hop at a
//! time (at most [`MAX_SYMLINK_HOPS`]) until it reaches something that is
//! not a link. Regular-file targets are claimed in a shared [`SeenSet`]
//! keyed by [`InodeSignature`]; the first caller to claim an inode gets the
//! file, later callers get a silent [`Resolution::Duplicate`].

use crate::error::EnumerateError;
use crate::walker::queue::FileInfo;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs::{self, Metadata};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Maximum symlink hops before declaring a loop
pub const MAX_SYMLINK_HOPS: usize = 100;

/// Identity of a filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InodeSignature {
    pub device: u64,
    pub rdev: u64,
    pub inode: u64,
}

impl InodeSignature {
    pub fn of(meta: &Metadata) -> Self {
        Self {
            device: meta.dev(),
            rdev: meta.rdev(),
            inode: meta.ino(),
        }
    }
}

/// Inodes already handed out during one enumeration run
///
/// Grows monotonically; never shrinks.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: DashMap<InodeSignature, PathBuf>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `sig` for `path`
    ///
    /// Returns `None` if this call inserted the signature, or the path that
    /// claimed it first.
    pub fn claim(&self, sig: InodeSignature, path: &Path) -> Option<PathBuf> {
        match self.inner.entry(sig) {
            Entry::Occupied(e) => Some(e.get().clone()),
            Entry::Vacant(e) => {
                e.insert(path.to_path_buf());
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Outcome of resolving a symlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A regular file seen for the first time
    File { path: PathBuf, info: FileInfo },

    /// Target already claimed through another path
    Duplicate { first: PathBuf },

    /// Target is a directory, device, socket or fifo
    NotRegular { target: PathBuf },
}

/// Resolves symlinks to regular files, de-duplicating by inode
#[derive(Debug, Default)]
pub struct SymlinkResolver {
    seen: SeenSet,
}

impl SymlinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Follow `path` to its final target
    ///
    /// Loop errors name the path that was asked for; lstat and readlink
    /// errors name the hop that failed.
    pub fn resolve(&self, path: &Path) -> Result<Resolution, EnumerateError> {
        let mut current = path.to_path_buf();
        let mut meta = lstat(&current)?;
        let mut hops = 0;

        while meta.file_type().is_symlink() {
            if hops == MAX_SYMLINK_HOPS {
                return Err(EnumerateError::SymlinkLoop {
                    path: path.to_path_buf(),
                });
            }
            hops += 1;

            let target = fs::read_link(&current).map_err(|source| EnumerateError::Readlink {
                path: current.clone(),
                source,
            })?;
            current = join_link_target(&current, &target);
            meta = lstat(&current)?;
        }

        trace!(path = %path.display(), target = %current.display(), hops, "Symlink resolved");

        if !meta.file_type().is_file() {
            return Ok(Resolution::NotRegular { target: current });
        }

        if let Some(first) = self.seen.claim(InodeSignature::of(&meta), &current) {
            return Ok(Resolution::Duplicate { first });
        }

        let info = FileInfo::from_metadata(&meta);
        Ok(Resolution::File {
            path: current,
            info,
        })
    }
}

fn lstat(path: &Path) -> Result<Metadata, EnumerateError> {
    fs::symlink_metadata(path).map_err(|source| EnumerateError::Lstat {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve a link target against the directory holding the link
///
/// No lexical `..` cleanup: `dir/..` has to be interpreted by the kernel
/// when `dir` is itself a symlink.
fn join_link_target(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }

    match link.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(target),
        _ => target.to_path_buf(),
    }
}
