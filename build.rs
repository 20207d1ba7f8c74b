//! Build script for ghash
//!
//! Embeds the repository version (`git describe`) and the build time so
//! `ghash --version` can report exactly what was built.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=GHASH_REPO_VERSION");

    let repo_version = std::env::var("GHASH_REPO_VERSION")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(git_describe)
        .unwrap_or_else(|| "UNDEFINED".to_string());

    let build_time = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    println!("cargo:rustc-env=GHASH_REPO_VERSION={}", repo_version);
    println!("cargo:rustc-env=GHASH_BUILD_TIME={}", build_time);
}

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8(output.stdout).ok()?;
    let version = version.trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}
