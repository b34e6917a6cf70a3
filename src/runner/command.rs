// src/runner/command.rs

//! Construction of the `ansible-playbook` command line.
//!
//! Kept as a pure value so the argument and environment layout can be
//! inspected and tested without spawning anything. The environment pairs
//! are applied to the child process only, never to our own environment.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Inputs for one playbook invocation.
#[derive(Debug)]
pub struct CommandSpec<'a> {
    /// Root of the bundled ansible tree (binary under `bin/`, config under
    /// `playbooks/ansible.cfg`).
    pub ansible_dir: &'a Path,
    /// Resolved path of the playbook to run.
    pub playbook: &'a Path,
    /// The user's configuration file, handed to ansible both as the `-i`
    /// argument and as an `@`-referenced extra-vars file.
    pub configuration: &'a Path,
    /// Absolute installation directory, exported as the `install_directory`
    /// extra variable.
    pub install_dir: &'a Path,
    /// Hostnames to limit execution to; empty means no `--limit`.
    pub nodes: &'a [String],
    /// Number of `v`s in the verbosity flag; 0 omits the flag.
    pub verbose_level: u8,
    /// Value for the child's `PYTHONPATH`.
    pub python_search_path: &'a OsStr,
}

/// A fully resolved command: program, arguments, and the child-only
/// environment variables.
#[derive(Debug)]
pub struct PlaybookCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(&'static str, OsString)>,
}

pub fn build_playbook_command(spec: &CommandSpec<'_>) -> PlaybookCommand {
    let program = spec.ansible_dir.join("bin").join("ansible-playbook");

    let mut args: Vec<OsString> = vec![
        "-i".into(),
        spec.configuration.into(),
        "-b".into(),
        spec.playbook.into(),
        "--extra-vars".into(),
        concat_os("install_directory=", spec.install_dir),
        "--extra-vars".into(),
        concat_os("@", spec.configuration),
    ];

    let limit = spec.nodes.join(",");
    if !limit.is_empty() {
        args.push("--limit".into());
        args.push(limit.into());
    }

    if spec.verbose_level > 0 {
        args.push(format!("-{}", "v".repeat(spec.verbose_level as usize)).into());
    }

    let env = vec![
        ("PYTHONPATH", spec.python_search_path.to_os_string()),
        (
            "ANSIBLE_CONFIG",
            spec.ansible_dir
                .join("playbooks")
                .join("ansible.cfg")
                .into_os_string(),
        ),
    ];

    PlaybookCommand { program, args, env }
}

impl PlaybookCommand {
    /// Render the environment assignments and full command line the way
    /// they are written to the run log before launch, one entry per line.
    pub fn render_for_log(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.env {
            out.push_str(&format!("export {}={}\n", key, value.to_string_lossy()));
        }
        out.push_str(&self.program.to_string_lossy());
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out.push('\n');
        out
    }
}

fn concat_os(prefix: &str, path: &Path) -> OsString {
    let mut value = OsString::from(prefix);
    value.push(path);
    value
}
