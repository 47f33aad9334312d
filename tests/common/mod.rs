//! Shared test helpers for trimerge integration tests.
//!
//! All tests use temp directories or the checked-in fixture cases; nothing
//! writes into the repository.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Directory holding one sub-directory per merge fixture case.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Path of one fixture case.
pub fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Create an empty temp directory.
pub fn scratch_dir() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}

/// Write `contents` to `dir/name`, creating parent directories.
pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    fs::write(&path, contents).expect("failed to write file");
    path
}

/// Read `dir/name` to a string.
pub fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).expect("failed to read file")
}

/// Run the trimerge binary in `dir`.
pub fn trimerge_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trimerge"))
        .args(args)
        .current_dir(dir)
        .env("TRIMERGE_LOG_FORMAT", "off")
        .env_remove("TRIMERGE_RESOLVE_MAX_LINES")
        .output()
        .expect("failed to execute trimerge")
}

/// Run trimerge and assert it succeeds. Returns stdout as string.
pub fn trimerge_ok(dir: &Path, args: &[&str]) -> String {
    let out = trimerge_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "trimerge {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run trimerge and assert it exits with status 1. Returns (stdout, stderr).
pub fn trimerge_conflicts(dir: &Path, args: &[&str]) -> (String, String) {
    let out = trimerge_in(dir, args);
    assert_eq!(
        out.status.code(),
        Some(1),
        "Expected trimerge {} to exit with 1.\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    (
        String::from_utf8_lossy(&out.stdout).to_string(),
        String::from_utf8_lossy(&out.stderr).to_string(),
    )
}
