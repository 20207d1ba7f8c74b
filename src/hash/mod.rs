//! Streaming file digests
//!
//! A [`HasherFactory`] hands out fresh [`DigestHasher`] instances, one per
//! file. [`hash_file`] streams a file through one of them and reports the
//! digest along with the number of bytes actually read, which verification
//! uses to notice files that changed size mid-read.
//!
//! The concrete algorithms live in [`algorithm`].

pub mod algorithm;

pub use algorithm::Algorithm;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for streaming files through a hasher
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// An incremental digest computation
pub trait DigestHasher: Send {
    /// Feed more bytes
    fn update(&mut self, data: &[u8]);

    /// Consume the hasher and return the digest bytes
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

/// Produces a fresh hasher for every file
///
/// Returning `None` means the algorithm cannot be instantiated; pipelines
/// probe the factory once at startup and treat that as a configuration
/// error instead of failing inside a worker.
pub trait HasherFactory: Send + Sync {
    /// Registry name written into manifest headers
    fn name(&self) -> &str;

    /// Create a new hasher instance
    fn new_hasher(&self) -> Option<Box<dyn DigestHasher>>;
}

/// Digest of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Algorithm registry name
    pub algorithm: String,

    /// Raw digest bytes
    pub bytes: Vec<u8>,

    /// Number of bytes fed to the hasher
    pub byte_count: u64,
}

impl Digest {
    /// Lower-case hex encoding of the digest bytes
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Hash everything `reader` yields
pub fn hash_reader<R: Read>(mut reader: R, factory: &dyn HasherFactory) -> io::Result<Digest> {
    let mut hasher = factory.new_hasher().ok_or_else(|| {
        io::Error::other(format!("no hasher available for '{}'", factory.name()))
    })?;

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut byte_count = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        byte_count += n as u64;
    }

    Ok(Digest {
        algorithm: factory.name().to_string(),
        bytes: hasher.finalize(),
        byte_count,
    })
}

/// Open `path` and hash its full contents
pub fn hash_file(path: &Path, factory: &dyn HasherFactory) -> io::Result<Digest> {
    let file = File::open(path)?;
    hash_reader(file, factory)
}
