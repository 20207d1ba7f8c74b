//! Configuration types for ghash
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Worker-count derivation and version constants

use crate::error::ConfigError;
use crate::hash::Algorithm;
use crate::walker::EnumerateOptions;
use clap::Parser;
use std::path::PathBuf;

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 1024;

/// Default workers per CPU; hashing is a mix of I/O and CPU
pub const PARALLELISM_FACTOR: usize = 2;

/// Product version written into manifest headers
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Full version line for `--version`
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " [",
    env!("GHASH_REPO_VERSION"),
    "; ",
    env!("GHASH_BUILD_TIME"),
    "]"
);

/// Generate and verify file digests
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ghash",
    version = LONG_VERSION,
    about = "Generate and verify cryptographic hashes of files",
    long_about = "Hashes files in parallel and writes a manifest of digest, size and path.\n\n\
                  A manifest can later be verified with --verify-from; every listed file is\n\
                  re-hashed and compared in constant time.",
    after_help = "EXAMPLES:\n    \
        ghash -r /data -o data.sums\n    \
        ghash -H blake3 -L file1 file2 > sums.txt\n    \
        ghash -v data.sums\n    \
        ghash -v < data.sums\n    \
        ghash --list-hashes"
)]
pub struct CliArgs {
    /// Files or directories to hash
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Recursively traverse directories
    #[arg(short = 'r', long)]
    pub recurse: bool,

    /// Don't cross file system boundaries
    #[arg(short = 'x', long)]
    pub one_filesystem: bool,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// Forcibly overwrite the output file
    #[arg(short = 'f', long)]
    pub force_overwrite: bool,

    /// Use hash algorithm H
    #[arg(short = 'H', long = "hash", default_value = Algorithm::DEFAULT.name(), value_name = "H")]
    pub hash: String,

    /// List supported hash algorithms
    #[arg(long)]
    pub list_hashes: bool,

    /// Verify the hashes in file F ("-" or no value reads stdin)
    #[arg(
        short = 'v',
        long,
        value_name = "F",
        num_args = 0..=1,
        default_missing_value = "-"
    )]
    pub verify_from: Option<String>,

    /// Write hashes to file F [stdout]
    #[arg(short = 'o', long, value_name = "F")]
    pub output: Option<PathBuf>,

    /// Workers per CPU
    #[arg(short = 'j', long, default_value_t = PARALLELISM_FACTOR, value_name = "N")]
    pub parallelism: usize,

    /// Explicit worker count (overrides --parallelism)
    #[arg(short = 'w', long, value_name = "NUM")]
    pub workers: Option<usize>,

    /// Show a progress spinner on stderr
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose logging
    #[arg(long)]
    pub verbose: bool,
}

/// Where a manifest to verify comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Stdin,
    File(PathBuf),
}

impl ManifestSource {
    fn from_arg(arg: &str) -> Self {
        if arg.is_empty() || arg == "-" {
            ManifestSource::Stdin
        } else {
            ManifestSource::File(PathBuf::from(arg))
        }
    }

    /// Name used to prefix per-line errors
    pub fn display_name(&self) -> String {
        match self {
            ManifestSource::Stdin => "(stdin)".to_string(),
            ManifestSource::File(path) => path.display().to_string(),
        }
    }
}

/// What this invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print the algorithm registry
    ListHashes,

    /// Hash the given roots into a manifest
    Generate {
        algorithm: Algorithm,
        roots: Vec<PathBuf>,
        output: Option<PathBuf>,
        force: bool,
        enumerate: EnumerateOptions,
    },

    /// Check a manifest against the filesystem
    Verify(ManifestSource),
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct HashConfig {
    pub mode: Mode,

    /// Number of hashing workers
    pub worker_count: usize,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl HashConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let worker_count = match args.workers {
            Some(count) => {
                if count == 0 || count > MAX_WORKERS {
                    return Err(ConfigError::InvalidWorkerCount {
                        count,
                        max: MAX_WORKERS,
                    });
                }
                count
            }
            None => {
                if args.parallelism == 0 {
                    return Err(ConfigError::InvalidParallelism {
                        factor: args.parallelism,
                    });
                }
                worker_count(num_cpus::get(), args.parallelism)
            }
        };

        // Precedence: list, verify, generate
        let mode = if args.list_hashes {
            Mode::ListHashes
        } else if let Some(source) = args.verify_from.as_deref() {
            Mode::Verify(ManifestSource::from_arg(source))
        } else {
            if args.paths.is_empty() {
                return Err(ConfigError::MissingInputs);
            }

            let algorithm = Algorithm::from_name(&args.hash).ok_or_else(|| {
                ConfigError::UnknownAlgorithm {
                    name: args.hash.clone(),
                }
            })?;

            Mode::Generate {
                algorithm,
                roots: args.paths,
                output: args.output,
                force: args.force_overwrite,
                enumerate: EnumerateOptions {
                    recurse: args.recurse,
                    one_filesystem: args.one_filesystem,
                    follow_symlinks: args.follow_symlinks,
                },
            }
        };

        Ok(Self {
            mode,
            worker_count,
            show_progress: args.progress,
            verbose: args.verbose,
        })
    }
}

/// Workers for `cpus` CPUs at `factor` workers each, clamped to `1..=MAX_WORKERS`
pub fn worker_count(cpus: usize, factor: usize) -> usize {
    cpus.saturating_mul(factor).clamp(1, MAX_WORKERS)
}
