// src/pyenv.rs

//! Python environment resolution for the bundled ansible runtime.
//!
//! Ansible depends on python 2.7 being installed and on the path as
//! `python`, and on `PYTHONPATH` covering the site-packages bundled under
//! the ansible directory (both the `lib` and `lib64` variants).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::errors::InstallerError;

const INTERPRETER: &str = "python";
const PYTHON_VERSION: &str = "2.7";

/// Resolved interpreter plus the `PYTHONPATH` value the ansible subprocess
/// needs. A plain value: the runner sets it on the child's environment
/// explicitly rather than mutating the parent process environment.
#[derive(Debug, Clone)]
pub struct PythonEnv {
    pub interpreter: PathBuf,
    pub search_path: OsString,
}

impl PythonEnv {
    /// Locate `python` on the PATH and compute the search path for the
    /// runtime bundled under `ansible_dir`.
    pub fn resolve(ansible_dir: &Path) -> Result<Self> {
        let interpreter = which::which(INTERPRETER).map_err(|_| InstallerError::PythonMissing {
            interpreter: INTERPRETER,
            version: PYTHON_VERSION,
        })?;

        Ok(Self {
            interpreter,
            search_path: search_path(ansible_dir)?,
        })
    }
}

/// Join the bundled `lib` and `lib64` site-packages directories with the
/// platform path-list separator. A relative `ansible_dir` is resolved
/// against the working directory first, so the value logged and exported to
/// the child is reproducible from anywhere.
pub fn search_path(ansible_dir: &Path) -> Result<OsString> {
    let ansible_dir = if ansible_dir.is_absolute() {
        ansible_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("resolving the working directory")?
            .join(ansible_dir)
    };
    let site_packages = PathBuf::from(format!("python{PYTHON_VERSION}")).join("site-packages");
    let lib = ansible_dir.join("lib").join(&site_packages);
    let lib64 = ansible_dir.join("lib64").join(&site_packages);
    let joined = std::env::join_paths([lib, lib64])?;
    Ok(joined)
}
