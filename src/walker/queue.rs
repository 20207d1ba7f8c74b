//! Bounded work queue with backpressure
//!
//! The queue holds at most `capacity` tasks (one per worker by default).
//! A producer that gets ahead of the workers blocks on `send` instead of
//! buffering the whole input set in memory.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

/// Stat snapshot carried along with a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Size in bytes
    pub size: u64,

    /// Unix mode (type + permission bits)
    pub mode: u32,

    pub is_dir: bool,

    pub is_symlink: bool,
}

impl FileInfo {
    pub fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        Self {
            size: meta.len(),
            mode: meta.mode(),
            is_dir: ft.is_dir(),
            is_symlink: ft.is_symlink(),
        }
    }
}

/// A regular file to be hashed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Path to open (the symlink target when links were followed)
    pub path: PathBuf,

    /// Stat taken at enumeration time
    pub info: FileInfo,
}

impl FileTask {
    pub fn new(path: PathBuf, info: FileInfo) -> Self {
        Self { path, info }
    }
}

/// Bounded multi-producer multi-consumer task queue
pub struct WorkQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> WorkQueue<T> {
    /// Create a queue holding at most `capacity` tasks (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Split into the producer and consumer halves
    ///
    /// The queue closes once every [`WorkQueueSender`] clone is dropped.
    pub fn split(self) -> (WorkQueueSender<T>, WorkQueueReceiver<T>) {
        (
            WorkQueueSender {
                sender: self.sender,
            },
            WorkQueueReceiver {
                receiver: self.receiver,
            },
        )
    }
}

/// Handle for sending tasks to the queue
pub struct WorkQueueSender<T> {
    sender: Sender<T>,
}

impl<T> Clone for WorkQueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> WorkQueueSender<T> {
    /// Send a task, blocking while the queue is full
    ///
    /// Returns the task back if every receiver is gone.
    pub fn send(&self, task: T) -> Result<(), T> {
        self.sender.send(task).map_err(|e| e.into_inner())
    }
}

/// Handle for receiving tasks from the queue
pub struct WorkQueueReceiver<T> {
    receiver: Receiver<T>,
}

impl<T> Clone for WorkQueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> WorkQueueReceiver<T> {
    /// Receive a task, blocking until one is available
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }
}
