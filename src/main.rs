//! ghash - parallel file digest generator and verifier
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use ghash::config::{CliArgs, HashConfig, ManifestSource, Mode};
use ghash::error::{ErrorReport, ManifestError};
use ghash::hash::Algorithm;
use ghash::output::SafeFile;
use ghash::progress::{print_summary, ProgressReporter};
use ghash::verify::Verifier;
use ghash::walker::{EnumerateOptions, HashCoordinator, HashOptions};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the run finished without collected errors
fn run() -> Result<bool> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = HashConfig::from_args(args).context("Invalid configuration")?;

    match config.mode.clone() {
        Mode::ListHashes => {
            list_hashes()?;
            Ok(true)
        }
        Mode::Generate {
            algorithm,
            roots,
            output,
            force,
            enumerate,
        } => generate(&config, algorithm, roots, output, force, enumerate),
        Mode::Verify(source) => verify(&config, source),
    }
}

fn list_hashes() -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "ghash: Available hash algorithms:")?;
    for algorithm in Algorithm::ALL {
        writeln!(stdout, "   {}", algorithm)?;
    }
    Ok(())
}

fn generate(
    config: &HashConfig,
    algorithm: Algorithm,
    roots: Vec<PathBuf>,
    output: Option<PathBuf>,
    force: bool,
    enumerate: EnumerateOptions,
) -> Result<bool> {
    let options = HashOptions {
        roots,
        worker_count: config.worker_count,
        version: ghash::config::PRODUCT_VERSION.to_string(),
        enumerate,
    };
    let coordinator = HashCoordinator::new(options, Arc::new(algorithm))
        .context("Failed to initialize hasher")?;

    let progress = config
        .show_progress
        .then(|| ProgressReporter::start(coordinator.stats()));

    let result = match output {
        None => coordinator
            .run(io::stdout())
            .map(|(result, _)| result)
            .context("Hash run failed"),
        Some(path) => {
            let file = SafeFile::create(&path, force).context("Can't open output")?;
            let (result, file) = coordinator.run(file).context("Hash run failed")?;
            if result.is_success() {
                let dest = file.commit().context("Can't write output")?;
                info!(output = %dest.display(), "Manifest written");
            } else {
                file.abort();
            }
            Ok(result)
        }
    };

    if let Some(progress) = progress {
        progress.finish();
    }
    let result = result?;

    if config.show_progress {
        print_summary(
            "Hashing Complete",
            result.files_hashed,
            result.bytes_hashed,
            result.errors.len(),
            result.duration,
        );
    }

    Ok(report_errors(&result.errors))
}

fn verify(config: &HashConfig, source: ManifestSource) -> Result<bool> {
    let name = source.display_name();
    let verifier = Verifier::new(config.worker_count);

    let progress = config
        .show_progress
        .then(|| ProgressReporter::start(verifier.stats()));

    let result = match &source {
        ManifestSource::Stdin => verifier.run(&name, BufReader::new(io::stdin())),
        ManifestSource::File(path) => {
            let file = File::open(path).map_err(|e| ManifestError::Open {
                source_name: name.clone(),
                reason: e.to_string(),
            })?;
            verifier.run(&name, BufReader::new(file))
        }
    };

    if let Some(progress) = progress {
        progress.finish();
    }
    let result = result.context("Verification failed")?;

    if config.show_progress {
        print_summary(
            "Verification Complete",
            result.files_verified,
            result.bytes_hashed,
            result.errors.len(),
            result.duration,
        );
    }

    Ok(report_errors(&result.errors))
}

/// Print collected errors to stderr; true if there were none
fn report_errors(errors: &ErrorReport) -> bool {
    if errors.is_empty() {
        return true;
    }
    eprintln!("{}", errors);
    false
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("ghash=debug,warn")
    } else {
        EnvFilter::new("ghash=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
