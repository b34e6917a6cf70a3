// src/lib.rs

pub mod cli;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod pyenv;
pub mod rundir;
pub mod runner;

use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;

use crate::cli::{CliArgs, Command, InstallArgs};
use crate::executor::{Executor, ExecutorOptions};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Install(install) => run_install(install).await,
    }
}

async fn run_install(args: InstallArgs) -> Result<()> {
    let options = ExecutorOptions {
        generated_assets_dir: PathBuf::from(&args.generated_assets_dir),
        verbose_level: args.verbose,
        dry_run: args.dry_run,
        ..ExecutorOptions::default()
    };

    let executor = Executor::new(options)?;
    executor
        .install(
            Path::new(&args.inventory),
            Path::new(&args.configuration),
            &args.limit,
        )
        .await?;

    if args.dry_run {
        println!("{}", style("Dry run complete, nothing was launched.").yellow());
    } else {
        println!(
            "{}",
            style("Kubernetes cluster installed successfully!").green()
        );
    }
    Ok(())
}
