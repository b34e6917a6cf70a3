// src/rundir.rs

//! Per-invocation run directories and file staging.
//!
//! Every `install` invocation gets its own `<runs_root>/<name>/<timestamp>`
//! directory holding copies of the user's inputs plus the ansible log. Run
//! directories are never reused and never cleaned up automatically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

/// Timestamp format: lexicographic order is chronological order, at second
/// resolution.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Create `<runs_root>/<name>/<timestamp>` and return its path.
///
/// Parents are created recursively with world read/write/execute mode; the
/// leaf is created non-recursively so that a second run for the same name
/// within the same second fails instead of silently sharing the directory.
pub fn create_run_directory(runs_root: &Path, name: &str) -> Result<PathBuf> {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let parent = runs_root.join(name);
    let run_dir = parent.join(timestamp);

    dir_builder(true)
        .create(&parent)
        .with_context(|| format!("creating runs directory {:?}", parent))?;
    dir_builder(false)
        .create(&run_dir)
        .with_context(|| format!("creating run directory {:?}", run_dir))?;

    Ok(run_dir)
}

#[cfg(unix)]
fn dir_builder(recursive: bool) -> fs::DirBuilder {
    use std::os::unix::fs::DirBuilderExt;
    let mut builder = fs::DirBuilder::new();
    builder.recursive(recursive).mode(0o777);
    builder
}

#[cfg(not(unix))]
fn dir_builder(recursive: bool) -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(recursive);
    builder
}

/// Full-content byte copy of `src` to `dst`, overwriting `dst` if it
/// exists. The destination is flushed to durable storage before returning.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let mut reader =
        fs::File::open(src).with_context(|| format!("opening source file {:?}", src))?;
    let mut writer =
        fs::File::create(dst).with_context(|| format!("creating destination file {:?}", dst))?;
    io::copy(&mut reader, &mut writer)
        .with_context(|| format!("copying {:?} to {:?}", src, dst))?;
    writer
        .sync_all()
        .with_context(|| format!("flushing {:?}", dst))?;
    Ok(())
}
