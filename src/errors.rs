// src/errors.rs

//! Crate-wide error types.
//!
//! The orchestration layers wrap with `anyhow::Context`; this enum carries
//! the specific failure kinds callers (and tests) need to tell apart.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error(
        "could not find '{interpreter}' in the PATH; ensure that python {version} \
         is installed and on the path as '{interpreter}'"
    )]
    PythonMissing {
        interpreter: &'static str,
        version: &'static str,
    },

    #[error("invalid executor options: {0}")]
    Validation(String),

    #[error("playbook {0:?} does not exist")]
    PlaybookNotFound(PathBuf),

    #[error("wait called, but playbook not started")]
    NotStarted,

    #[error("a playbook was already started on this runner")]
    AlreadyStarted,

    #[error("ansible-playbook exited with status {}", code_label(.code))]
    PlaybookFailed { code: Option<i32> },
}

fn code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        // No code means the process died from a signal.
        None => "signal".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = anyhow::Result<T>;
