#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use kubestrap::errors::InstallerError;
use kubestrap::executor::{Executor, ExecutorOptions};
use kubestrap::pyenv::PythonEnv;
use kubestrap::runner::PlaybookRunner;
use kubestrap::runner::tee::LogSink;

type TestResult = Result<(), Box<dyn Error>>;

/// A temp tree that looks like the bundled ansible distribution, with a
/// shell script standing in for `ansible-playbook`.
struct Fixture {
    dir: tempfile::TempDir,
    ansible_dir: PathBuf,
    runs_dir: PathBuf,
    inventory: PathBuf,
    configuration: PathBuf,
    /// Touched by the fake binary, so tests can tell whether it ran.
    marker: PathBuf,
}

fn fixture(exit_code: i32) -> Result<Fixture, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let ansible_dir = dir.path().join("ansible");
    fs::create_dir_all(ansible_dir.join("bin"))?;
    fs::create_dir_all(ansible_dir.join("playbooks"))?;

    let marker = dir.path().join("ran.marker");
    let script = format!(
        "#!/bin/sh\n\
         touch '{}'\n\
         echo 'PLAY [all]'\n\
         echo 'unreachable=0' 1>&2\n\
         exit {}\n",
        marker.display(),
        exit_code
    );
    let binary = ansible_dir.join("bin").join("ansible-playbook");
    fs::write(&binary, script)?;
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755))?;

    fs::write(ansible_dir.join("playbooks").join("install.yaml"), "---\n")?;
    fs::write(ansible_dir.join("playbooks").join("ansible.cfg"), "[defaults]\n")?;

    let inventory = dir.path().join("inventory.ini");
    fs::write(&inventory, "[master]\nnode1\n")?;
    let configuration = dir.path().join("configuration.yaml");
    fs::write(&configuration, "cluster_name: test\n")?;

    let runs_dir = dir.path().join("runs");
    Ok(Fixture {
        ansible_dir,
        runs_dir,
        inventory,
        configuration,
        marker,
        dir,
    })
}

fn python_env() -> PythonEnv {
    PythonEnv {
        interpreter: PathBuf::from("/usr/bin/env"),
        search_path: "/tmp/site-packages".into(),
    }
}

fn executor(f: &Fixture, dry_run: bool) -> Executor {
    Executor::with_python_env(
        ExecutorOptions {
            generated_assets_dir: f.dir.path().join("generated"),
            verbose_level: 1,
            runs_dir: f.runs_dir.clone(),
            ansible_dir: f.ansible_dir.clone(),
            dry_run,
        },
        python_env(),
    )
    .expect("valid options")
}

/// A runner staged into its own run directory, for exercising the state
/// machine without the executor.
async fn runner_in(f: &Fixture) -> Result<PlaybookRunner, Box<dyn Error>> {
    let run_dir = f.dir.path().join("run");
    fs::create_dir_all(&run_dir)?;
    let log = LogSink::create(&run_dir.join("ansible.log")).await?;
    Ok(PlaybookRunner::new(
        python_env(),
        log,
        0,
        f.ansible_dir.clone(),
        run_dir,
    ))
}

/// The single run directory produced by one install call.
fn only_run_dir(runs_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let mut entries = fs::read_dir(runs_dir.join("install"))?
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(entries.len(), 1, "expected exactly one run directory");
    Ok(entries.remove(0).path())
}

#[tokio::test]
async fn install_succeeds_when_ansible_exits_zero() -> TestResult {
    let f = fixture(0)?;
    executor(&f, false)
        .install(&f.inventory, &f.configuration, &[])
        .await?;

    assert!(f.marker.exists(), "the fake ansible-playbook did not run");

    let run_dir = only_run_dir(&f.runs_dir)?;
    assert_eq!(
        fs::read(run_dir.join("configuration.yaml"))?,
        fs::read(&f.configuration)?
    );
    assert_eq!(
        fs::read(run_dir.join("inventory.ini"))?,
        fs::read(&f.inventory)?
    );

    let log = fs::read_to_string(run_dir.join("ansible.log"))?;
    assert!(log.contains("export PYTHONPATH=/tmp/site-packages"));
    assert!(log.contains("export ANSIBLE_CONFIG="));
    assert!(log.contains("ansible-playbook"));
    assert!(log.contains("PLAY [all]"));
    assert!(log.contains("unreachable=0"));
    // The resolved command is logged before any process output.
    assert!(log.find("export PYTHONPATH").unwrap() < log.find("PLAY [all]").unwrap());
    Ok(())
}

#[tokio::test]
async fn install_fails_when_ansible_exits_nonzero() -> TestResult {
    let f = fixture(2)?;
    let err = executor(&f, false)
        .install(&f.inventory, &f.configuration, &[])
        .await
        .expect_err("exit 2 must fail the install");

    match err.downcast_ref::<InstallerError>() {
        Some(InstallerError::PlaybookFailed { code: Some(2) }) => Ok(()),
        other => panic!("unexpected error kind: {other:?}"),
    }
}

#[tokio::test]
async fn install_fails_when_the_playbook_is_missing() -> TestResult {
    let f = fixture(0)?;
    fs::remove_file(f.ansible_dir.join("playbooks").join("install.yaml"))?;

    let err = executor(&f, false)
        .install(&f.inventory, &f.configuration, &[])
        .await
        .expect_err("missing playbook must fail");

    assert!(matches!(
        err.downcast_ref::<InstallerError>(),
        Some(InstallerError::PlaybookNotFound(_))
    ));
    assert!(!f.marker.exists());
    Ok(())
}

#[tokio::test]
async fn dry_run_stages_the_run_directory_without_launching() -> TestResult {
    let f = fixture(0)?;
    executor(&f, true)
        .install(&f.inventory, &f.configuration, &[])
        .await?;

    assert!(!f.marker.exists(), "dry-run must not launch ansible");

    let run_dir = only_run_dir(&f.runs_dir)?;
    assert!(run_dir.join("configuration.yaml").exists());
    assert!(run_dir.join("inventory.ini").exists());
    let log = fs::read_to_string(run_dir.join("ansible.log"))?;
    assert!(log.contains("ansible-playbook"));
    Ok(())
}

#[tokio::test]
async fn wait_before_start_fails_with_not_started() -> TestResult {
    let f = fixture(0)?;
    let mut runner = runner_in(&f).await?;

    let err = runner.wait().await.expect_err("wait without start");
    assert!(matches!(
        err.downcast_ref::<InstallerError>(),
        Some(InstallerError::NotStarted)
    ));
    Ok(())
}

#[tokio::test]
async fn second_start_without_wait_is_rejected() -> TestResult {
    let f = fixture(0)?;
    let mut runner = runner_in(&f).await?;

    runner
        .start_playbook("install.yaml", &f.inventory, &f.configuration, &[])
        .await?;
    let err = runner
        .start_playbook("install.yaml", &f.inventory, &f.configuration, &[])
        .await
        .expect_err("second start must be rejected");
    assert!(matches!(
        err.downcast_ref::<InstallerError>(),
        Some(InstallerError::AlreadyStarted)
    ));

    // The first execution is unaffected by the rejected start.
    runner.wait().await?;
    Ok(())
}

#[tokio::test]
async fn start_after_completion_is_rejected() -> TestResult {
    let f = fixture(0)?;
    let mut runner = runner_in(&f).await?;

    runner
        .start_playbook("install.yaml", &f.inventory, &f.configuration, &[])
        .await?;
    runner.wait().await?;

    let err = runner
        .start_playbook("install.yaml", &f.inventory, &f.configuration, &[])
        .await
        .expect_err("runner never transitions back to idle");
    assert!(matches!(
        err.downcast_ref::<InstallerError>(),
        Some(InstallerError::AlreadyStarted)
    ));
    Ok(())
}

#[tokio::test]
async fn executor_requires_a_generated_assets_directory() -> TestResult {
    let err = Executor::with_python_env(
        ExecutorOptions {
            generated_assets_dir: PathBuf::new(),
            ..ExecutorOptions::default()
        },
        python_env(),
    )
    .expect_err("empty generated assets dir must be rejected");

    assert!(matches!(
        err.downcast_ref::<InstallerError>(),
        Some(InstallerError::Validation(_))
    ));
    Ok(())
}

#[tokio::test]
async fn certs_dir_is_derived_from_the_generated_assets_dir() -> TestResult {
    let f = fixture(0)?;
    let executor = executor(&f, false);
    assert_eq!(executor.certs_dir(), f.dir.path().join("generated").join("pki"));
    Ok(())
}
