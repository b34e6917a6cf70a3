// src/executor.rs

//! Orchestration façade: validates options, stages a run directory, and
//! drives the playbook runner. One task per `install` call; any failure at
//! any stage aborts the call, nothing is retried.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::errors::InstallerError;
use crate::pyenv::PythonEnv;
use crate::rundir;
use crate::runner::{PlaybookRunner, tee::LogSink};

/// Options for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Where assets generated during the installation are stored. Required.
    pub generated_assets_dir: PathBuf,
    /// Ansible verbosity level; 0 disables the `-v` flag.
    pub verbose_level: u8,
    /// Where per-run staging/log directories are kept.
    pub runs_dir: PathBuf,
    /// Root of the bundled ansible tree.
    pub ansible_dir: PathBuf,
    /// Stage and log without launching ansible.
    pub dry_run: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            generated_assets_dir: PathBuf::new(),
            verbose_level: 1,
            runs_dir: PathBuf::from("./runs"),
            ansible_dir: PathBuf::from("ansible"),
            dry_run: false,
        }
    }
}

/// One orchestration request. Owned by the executor for the duration of a
/// single call; nothing outlives the run directory it produces.
struct Task<'a> {
    /// Name of the task, used for the runs directory.
    name: &'static str,
    /// The playbook filename under the bundled playbooks directory.
    playbook: &'static str,
    inventory: &'a Path,
    configuration: &'a Path,
    /// Run the task on specific nodes only; empty means all.
    limit: &'a [String],
}

/// Carries out installations with the bundled ansible playbooks.
#[derive(Debug)]
pub struct Executor {
    options: ExecutorOptions,
    python: PythonEnv,
    certs_dir: PathBuf,
}

impl Executor {
    /// Validate options and resolve the python environment up front, so a
    /// broken setup fails before any run directory is created.
    pub fn new(options: ExecutorOptions) -> Result<Self> {
        let python = PythonEnv::resolve(&options.ansible_dir)?;
        Self::with_python_env(options, python)
    }

    /// Like [`Executor::new`] but with an explicit python environment.
    pub fn with_python_env(options: ExecutorOptions, python: PythonEnv) -> Result<Self> {
        if options.generated_assets_dir.as_os_str().is_empty() {
            return Err(InstallerError::Validation(
                "generated assets directory cannot be empty".to_string(),
            )
            .into());
        }

        // Reserved for the playbooks' PKI assets; derived here so every
        // caller agrees on the location.
        let certs_dir = options.generated_assets_dir.join("pki");

        Ok(Self {
            options,
            python,
            certs_dir,
        })
    }

    /// Where certificate assets generated by the playbooks land.
    pub fn certs_dir(&self) -> &Path {
        &self.certs_dir
    }

    /// Install the cluster.
    pub async fn install(
        &self,
        inventory: &Path,
        configuration: &Path,
        nodes: &[String],
    ) -> Result<()> {
        self.execute(Task {
            name: "install",
            playbook: "install.yaml",
            inventory,
            configuration,
            limit: nodes,
        })
        .await
    }

    async fn execute(&self, task: Task<'_>) -> Result<()> {
        let run_dir = rundir::create_run_directory(&self.options.runs_dir, task.name)
            .with_context(|| format!("creating working directory for {:?}", task.name))?;
        info!(run_dir = ?run_dir, task = task.name, "created run directory");

        let log_path = run_dir.join("ansible.log");
        let log = LogSink::create(&log_path)
            .await
            .with_context(|| format!("creating ansible log file {:?}", log_path))?;

        let mut runner = PlaybookRunner::new(
            self.python.clone(),
            log,
            self.options.verbose_level,
            self.options.ansible_dir.clone(),
            run_dir,
        );

        if self.options.dry_run {
            return runner
                .dry_run(task.playbook, task.inventory, task.configuration, task.limit)
                .await
                .context("staging ansible playbook run");
        }

        runner
            .start_playbook(task.playbook, task.inventory, task.configuration, task.limit)
            .await
            .context("starting ansible playbook")?;

        runner.wait().await.context("running ansible playbook")
    }
}
