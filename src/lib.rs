//! ghash - Parallel File Digest Generator and Verifier
//!
//! Hashes files with a pool of worker threads and records the results in a
//! line-oriented manifest; later, verifies a manifest by re-hashing every
//! listed file and comparing digests in constant time.
//!
//! # Features
//!
//! - **Symlink-Safe Enumeration**: Symlink chains are followed hop by hop
//!   with a bounded depth; loops are reported and targets reachable through
//!   several links are hashed once.
//!
//! - **Parallel Hashing**: A fixed pool of workers (two per CPU by default)
//!   fed from a bounded queue, so enumeration never races ahead of hashing.
//!
//! - **Partial Failure**: Unreadable files, malformed manifest lines and
//!   mismatches are collected and reported together; the run always
//!   attempts every remaining file.
//!
//! - **Many Algorithms**: SHA-2, SHA-3, BLAKE2 and BLAKE3 variants.
//!
//! # Architecture
//!
//! ```text
//!  generate                                 verify
//!  ────────                                 ──────
//!  CLI roots                                manifest
//!     │                                        │ header (fatal if bad)
//!     ▼                                        ▼
//!  Enumerator ── SymlinkResolver          manifest-reader
//!     │                                        │
//!     ▼          bounded work queue            ▼
//!  ┌──────────────────────────────────────────────────┐
//!  │            WorkerPool (hasher-0..N)              │
//!  └───────┬──────────────────────────────┬───────────┘
//!          │ result lines                 │ ErrorRecords
//!          ▼                              ▼
//!   manifest-writer                error-harvester
//!          │                              │
//!          ▼                              ▼
//!   stdout / SafeFile              ErrorReport → exit status
//! ```
//!
//! # Example
//!
//! ```bash
//! # Hash a tree into a manifest
//! ghash -r /data -o data.sums
//!
//! # Verify it later
//! ghash -v data.sums
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod output;
pub mod progress;
pub mod verify;
pub mod walker;

pub use config::{CliArgs, HashConfig, Mode};
pub use error::{ErrorRecord, ErrorReport, GhashError, Result};
pub use hash::{Algorithm, HasherFactory};
pub use verify::{Verifier, VerifyResult};
pub use walker::{HashCoordinator, HashOptions, HashResult};
