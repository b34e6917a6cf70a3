// src/runner/mod.rs

//! Ansible playbook process runner.
//!
//! - [`command`] builds the `ansible-playbook` command line and child
//!   environment as a pure value.
//! - [`tee`] duplicates the child's output to the console and the run log.
//! - [`PlaybookRunner`] owns the subprocess lifecycle: Idle → Started →
//!   Completed, with no way back. One playbook per runner instance.

pub mod command;
pub mod tee;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::InstallerError;
use crate::pyenv::PythonEnv;
use crate::rundir;
use crate::runner::command::{CommandSpec, PlaybookCommand, build_playbook_command};
use crate::runner::tee::LogSink;

enum RunnerState {
    Idle,
    Started {
        child: Child,
        pumps: Vec<JoinHandle<()>>,
    },
    Completed,
}

/// Runs a single ansible playbook against an inventory, staging the user's
/// inputs into the run directory and streaming output to console + log.
pub struct PlaybookRunner {
    python: PythonEnv,
    log: LogSink,
    verbose_level: u8,
    ansible_dir: PathBuf,
    run_dir: PathBuf,
    state: RunnerState,
}

impl PlaybookRunner {
    pub fn new(
        python: PythonEnv,
        log: LogSink,
        verbose_level: u8,
        ansible_dir: PathBuf,
        run_dir: PathBuf,
    ) -> Self {
        Self {
            python,
            log,
            verbose_level,
            ansible_dir,
            run_dir,
            state: RunnerState::Idle,
        }
    }

    /// Start the playbook asynchronously with the given inventory and
    /// configuration. `nodes` restricts execution to a subset of inventory
    /// hosts; empty means no restriction.
    pub async fn start_playbook(
        &mut self,
        playbook_file: &str,
        inventory: &Path,
        configuration: &Path,
        nodes: &[String],
    ) -> Result<()> {
        if !matches!(self.state, RunnerState::Idle) {
            return Err(InstallerError::AlreadyStarted.into());
        }

        let cmd = self
            .stage(playbook_file, inventory, configuration, nodes)
            .await?;

        info!(playbook = %playbook_file, "starting ansible-playbook");
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &cmd.env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("spawning {:?}", cmd.program))?;

        let mut pumps = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tee::spawn_tee(stdout, tokio::io::stdout(), self.log.sender()));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tee::spawn_tee(stderr, tokio::io::stderr(), self.log.sender()));
        }

        self.state = RunnerState::Started { child, pumps };
        Ok(())
    }

    /// Resolve and log the command without launching it. The run directory
    /// is staged exactly as for a real start. Consumes the runner's single
    /// execution slot.
    pub async fn dry_run(
        &mut self,
        playbook_file: &str,
        inventory: &Path,
        configuration: &Path,
        nodes: &[String],
    ) -> Result<()> {
        if !matches!(self.state, RunnerState::Idle) {
            return Err(InstallerError::AlreadyStarted.into());
        }
        let cmd = self
            .stage(playbook_file, inventory, configuration, nodes)
            .await?;
        info!(program = ?cmd.program, "dry-run: not launching ansible-playbook");
        self.state = RunnerState::Completed;
        self.log.shutdown().await;
        Ok(())
    }

    /// Block until the previously started playbook process exits. Returns
    /// Ok only for a zero exit status.
    pub async fn wait(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, RunnerState::Completed);
        let (mut child, pumps) = match state {
            RunnerState::Started { child, pumps } => (child, pumps),
            RunnerState::Idle | RunnerState::Completed => {
                return Err(InstallerError::NotStarted.into());
            }
        };

        let status = child
            .wait()
            .await
            .context("waiting for ansible-playbook process")?;

        // Drain remaining output, then flush and sync the log.
        for pump in pumps {
            let _ = pump.await;
        }
        self.log.shutdown().await;

        info!(code = ?status.code(), success = status.success(), "ansible-playbook exited");
        if status.success() {
            Ok(())
        } else {
            Err(InstallerError::PlaybookFailed {
                code: status.code(),
            }
            .into())
        }
    }

    /// Validate the playbook, stage the user's inputs into the run
    /// directory, and write the resolved environment + command line to the
    /// log before anything launches.
    async fn stage(
        &self,
        playbook_file: &str,
        inventory: &Path,
        configuration: &Path,
        nodes: &[String],
    ) -> Result<PlaybookCommand> {
        let playbook = self.ansible_dir.join("playbooks").join(playbook_file);
        if !playbook.exists() {
            return Err(InstallerError::PlaybookNotFound(playbook).into());
        }

        rundir::copy_file(configuration, &self.run_dir.join("configuration.yaml"))
            .with_context(|| format!("staging configuration.yaml into {:?}", self.run_dir))?;
        rundir::copy_file(inventory, &self.run_dir.join("inventory.ini"))
            .with_context(|| format!("staging inventory.ini into {:?}", self.run_dir))?;
        debug!(run_dir = ?self.run_dir, "staged inventory and configuration");

        let install_dir =
            std::env::current_dir().context("resolving the installation directory")?;

        let cmd = build_playbook_command(&CommandSpec {
            ansible_dir: &self.ansible_dir,
            playbook: &playbook,
            configuration,
            install_dir: &install_dir,
            nodes,
            verbose_level: self.verbose_level,
            python_search_path: &self.python.search_path,
        });

        for line in cmd.render_for_log().lines() {
            self.log.write_line(line).await?;
        }

        Ok(cmd)
    }
}
