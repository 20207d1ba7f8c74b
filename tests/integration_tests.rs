//! Integration tests for ghash
//!
//! These run the full generate and verify pipelines against temporary
//! directory trees.

use ghash::error::{GhashError, ManifestError};
use ghash::hash::{hash_file, Algorithm};
use ghash::manifest::decode_entry;
use ghash::output::SafeFile;
use ghash::verify::Verifier;
use ghash::walker::{EnumerateOptions, HashCoordinator, HashOptions, HashResult};
use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn build_tree(root: &Path) {
    fs::create_dir_all(root.join("docs/deep")).unwrap();
    fs::write(root.join("readme.txt"), b"hello world\n").unwrap();
    fs::write(root.join("docs/a|pipe.txt"), b"pipes in names").unwrap();
    fs::write(root.join("docs/space name.md"), vec![7u8; 100_000]).unwrap();
    fs::write(root.join("docs/deep/empty"), b"").unwrap();
    fs::write(root.join("docs/deep/new\nline"), b"newline in name").unwrap();
}

fn generate(
    roots: Vec<PathBuf>,
    algorithm: Algorithm,
    workers: usize,
    enumerate: EnumerateOptions,
) -> (HashResult, String) {
    let options = HashOptions {
        roots,
        worker_count: workers,
        version: "0.1.0".into(),
        enumerate,
    };
    let coordinator = HashCoordinator::new(options, Arc::new(algorithm)).unwrap();
    let (result, out) = coordinator.run(Vec::new()).unwrap();
    (result, String::from_utf8(out).unwrap())
}

fn recursive() -> EnumerateOptions {
    EnumerateOptions {
        recurse: true,
        ..Default::default()
    }
}

fn verify(manifest: &str, workers: usize) -> ghash::Result<ghash::VerifyResult> {
    Verifier::new(workers).run("sums", Cursor::new(manifest.as_bytes().to_vec()))
}

fn entry_lines(manifest: &str) -> BTreeSet<String> {
    manifest.lines().skip(1).map(str::to_string).collect()
}

#[test]
fn test_generate_then_verify_is_clean() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    for algorithm in Algorithm::ALL {
        let (result, manifest) =
            generate(vec![dir.path().to_path_buf()], algorithm, 4, recursive());
        assert!(result.is_success(), "{}: {}", algorithm, result.errors);
        assert_eq!(result.files_hashed, 5);

        let header = manifest.lines().next().unwrap();
        assert_eq!(header, format!("#!ghash {} 0.1.0", algorithm));

        let verified = verify(&manifest, 3).unwrap();
        assert!(verified.is_success(), "{}: {}", algorithm, verified.errors);
        assert_eq!(verified.files_verified, 5);
    }
}

#[test]
fn test_pipeline_matches_single_threaded_hash() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let (_, manifest) = generate(
        vec![dir.path().to_path_buf()],
        Algorithm::Sha3_256,
        8,
        recursive(),
    );
    for line in manifest.lines().skip(1) {
        let entry = decode_entry(line).unwrap();
        let reference = hash_file(&entry.path, &Algorithm::Sha3_256).unwrap();
        assert_eq!(entry.expected_digest, reference.to_hex());
        assert_eq!(entry.expected_size, reference.byte_count);
    }
}

#[test]
fn test_single_byte_change_is_one_error() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let (_, manifest) = generate(vec![dir.path().to_path_buf()], Algorithm::Blake3, 4, recursive());

    let target = dir.path().join("docs/space name.md");
    let mut data = fs::read(&target).unwrap();
    data[50_000] ^= 0xff;
    fs::write(&target, data).unwrap();

    let verified = verify(&manifest, 4).unwrap();
    assert_eq!(verified.errors.len(), 1);
    assert_eq!(verified.files_verified, 4);

    let record = &verified.errors.records()[0];
    assert_eq!(record.message, format!("file modified '{}'", target.display()));
}

#[test]
fn test_size_change_reported_without_hashing() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let (_, manifest) = generate(vec![dir.path().to_path_buf()], Algorithm::Sha256, 2, recursive());
    let target = dir.path().join("readme.txt");
    fs::write(&target, b"hello world, longer now\n").unwrap();

    let verified = verify(&manifest, 2).unwrap();
    assert_eq!(verified.errors.len(), 1);
    assert!(verified.errors.records()[0].message.contains("size mismatch: exp 12, saw 24"));
}

#[test]
fn test_worker_count_does_not_change_output_set() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    fs::create_dir(dir.path().join("plain-dir")).unwrap();
    let roots = vec![
        dir.path().join("readme.txt"),
        dir.path().join("plain-dir"),
        dir.path().join("missing"),
        dir.path().join("docs/a|pipe.txt"),
    ];

    let (one, manifest_one) = generate(
        roots.clone(),
        Algorithm::Sha512,
        1,
        EnumerateOptions::default(),
    );
    let (many, manifest_many) = generate(roots, Algorithm::Sha512, 16, EnumerateOptions::default());

    assert_eq!(entry_lines(&manifest_one), entry_lines(&manifest_many));
    assert_eq!(entry_lines(&manifest_one).len(), 2);

    let errors = |r: &HashResult| -> BTreeSet<String> {
        r.errors.records().iter().map(|e| e.to_string()).collect()
    };
    assert_eq!(errors(&one), errors(&many));
    assert_eq!(one.errors.len(), 2);
}

#[test]
fn test_two_links_one_entry() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("target");
    fs::write(&target, b"shared").unwrap();
    symlink("target", dir.path().join("first")).unwrap();
    symlink(&target, dir.path().join("second")).unwrap();

    let options = EnumerateOptions {
        follow_symlinks: true,
        ..Default::default()
    };
    let roots = vec![dir.path().join("first"), dir.path().join("second")];
    let (result, manifest) = generate(roots, Algorithm::Blake2s, 2, options);

    assert!(result.is_success(), "{}", result.errors);
    let lines = entry_lines(&manifest);
    assert_eq!(lines.len(), 1);
    let entry = decode_entry(lines.iter().next().unwrap()).unwrap();
    assert_eq!(entry.path, target);
}

#[test]
fn test_symlink_cycle_terminates_with_error() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    symlink("b", &a).unwrap();
    symlink("c", dir.path().join("b")).unwrap();
    symlink("a", dir.path().join("c")).unwrap();
    fs::write(dir.path().join("ok"), b"fine").unwrap();

    let options = EnumerateOptions {
        follow_symlinks: true,
        ..Default::default()
    };
    let (result, manifest) = generate(
        vec![a.clone(), dir.path().join("ok")],
        Algorithm::Sha256,
        2,
        options,
    );

    assert_eq!(entry_lines(&manifest).len(), 1);
    assert_eq!(
        result.errors.to_string(),
        format!("{}: too many levels of symbolic links", a.display())
    );
}

#[test]
fn test_fatal_header_errors_touch_no_files() {
    let bogus = "#!notghash sha256 0.1.0\nzz|1|\"/definitely/not/here\"\n";
    assert!(matches!(
        verify(bogus, 2),
        Err(GhashError::Manifest(ManifestError::BadMagic { .. }))
    ));

    let unknown = "#!ghash whirlpool 0.1.0\nzz|1|\"/definitely/not/here\"\n";
    match verify(unknown, 2) {
        Err(GhashError::Manifest(ManifestError::UnknownAlgorithm { algorithm, .. })) => {
            assert_eq!(algorithm, "whirlpool")
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.files_verified)),
    }
}

#[test]
fn test_malformed_lines_reported_with_line_numbers() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let (_, manifest) = generate(
        vec![dir.path().join("readme.txt")],
        Algorithm::Sha256,
        1,
        EnumerateOptions::default(),
    );
    let manifest = format!("{}garbage\n{}", manifest, "ab|notasize|\"x\"\n");

    let verified = verify(&manifest, 2).unwrap();
    assert_eq!(verified.files_verified, 1);

    let contexts: BTreeSet<_> = verified
        .errors
        .records()
        .iter()
        .map(|r| r.context.clone())
        .collect();
    assert_eq!(contexts, BTreeSet::from(["sums: 3".to_string(), "sums: 4".to_string()]));
}

#[test]
fn test_safe_file_output_round_trip() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let dest = dir.path().join("out.sums");

    let options = HashOptions {
        roots: vec![dir.path().join("docs")],
        worker_count: 2,
        version: "0.1.0".into(),
        enumerate: recursive(),
    };
    let coordinator = HashCoordinator::new(options, Arc::new(Algorithm::Blake2b256)).unwrap();
    let file = SafeFile::create(&dest, false).unwrap();
    let (result, file) = coordinator.run(file).unwrap();
    assert!(result.is_success());
    file.commit().unwrap();

    let manifest = fs::read_to_string(&dest).unwrap();
    assert_eq!(entry_lines(&manifest).len(), 4);

    let reader = std::io::BufReader::new(fs::File::open(&dest).unwrap());
    let verified = Verifier::new(2).run("out.sums", reader).unwrap();
    assert!(verified.is_success(), "{}", verified.errors);
    assert_eq!(verified.algorithm.name(), Algorithm::Blake2b256.name());
}
