//! Stamps the binary with the commit and date printed by `votekick version`.

use chrono::{DateTime, Utc};
use std::process::Command;

fn main() {
    println!("cargo:rustc-env=VOTEKICK_GIT_HASH={}", git_revision());
    println!("cargo:rustc-env=VOTEKICK_BUILD_DATE={}", build_date());

    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}

/// Short hash of HEAD, with a `-dirty` suffix for uncommitted changes
fn git_revision() -> String {
    let Some(hash) = git(&["rev-parse", "--short", "HEAD"]) else {
        return "unknown".to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
        _ => hash,
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// UTC build date, pinned by `SOURCE_DATE_EPOCH` for reproducible builds
fn build_date() -> String {
    let pinned = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    pinned
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d")
        .to_string()
}
