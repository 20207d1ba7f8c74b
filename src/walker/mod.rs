//! Concurrent enumeration and hashing pipeline
//!
//! # Architecture
//!
//! ```text
//!   CLI roots
//!       │
//! ┌─────▼──────────────┐  lstat / readlink   ┌──────────────────┐
//! │    Enumerator      │◄───────────────────►│ SymlinkResolver  │
//! │ (enumerator thread)│                     │  SeenSet (inode) │
//! └─────┬──────────────┘                     └──────────────────┘
//!       │ FileTask (bounded, capacity = workers)
//! ┌─────▼─────┐  ┌───────────┐         ┌───────────┐
//! │ hasher-0  │  │ hasher-1  │   ...   │ hasher-N  │
//! └─────┬─────┘  └─────┬─────┘         └─────┬─────┘
//!       │ lines        │                     │        errors
//!       ▼              ▼                     ▼          │
//! ┌─────────────────────────────┐   ┌─────────────────▼──┐
//! │       manifest-writer       │   │  error-harvester   │
//! └─────────────────────────────┘   └────────────────────┘
//! ```
//!
//! Teardown order is fixed: the producer and all workers are joined before
//! the writer and harvester streams are closed.

pub mod coordinator;
pub mod enumerator;
pub mod harvester;
pub mod pool;
pub mod queue;
pub mod resolver;
pub mod writer;

pub use coordinator::{HashCoordinator, HashOptions, HashResult};
pub use enumerator::{EnumerateOptions, Enumerator};
pub use harvester::{ErrorHarvester, ErrorSink};
pub use pool::{JobOutcome, RunStats, WorkerPool};
pub use queue::{FileInfo, FileTask, WorkQueue, WorkQueueReceiver, WorkQueueSender};
pub use resolver::{InodeSignature, Resolution, SeenSet, SymlinkResolver, MAX_SYMLINK_HOPS};
pub use writer::{ResultSink, ResultWriter};
