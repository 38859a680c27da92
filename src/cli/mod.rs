//! cli
//!
//! Operational command-line surface.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load and validate configuration
//! - Delegate to the collector and remote client
//!
//! The commands exist for operators: `check` probes repository access,
//! `diff` previews what a sync would commit, and `sync` re-triggers a sync
//! by hand (the recovery path when a background run exhausted its retries).
//! None of them touch the pending-event batcher.

pub mod args;

pub use args::{Cli, Command};

use anyhow::{Context, Result};

use crate::collector::ChangeCollector;
use crate::config::SyncConfig;
use crate::remote::{ContentRemote, GitHubRemote};
use crate::types::Change;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = SyncConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let base = match cli.base {
        Some(base) => base,
        None => std::env::current_dir().context("failed to resolve working directory")?,
    };

    let remote = GitHubRemote::from_config(&config)?;

    match cli.command {
        Command::Check => check(&remote).await,
        Command::Diff => diff(&remote, &config, &base).await,
        Command::Sync { message } => sync(&remote, &config, &base, &message).await,
    }
}

async fn check(remote: &GitHubRemote) -> Result<()> {
    let info = remote.check_connection().await?;
    println!("Connected to {}", info.full_name);
    println!("Permissions: {}", info.permissions);
    Ok(())
}

async fn diff(remote: &GitHubRemote, config: &SyncConfig, base: &std::path::Path) -> Result<()> {
    let tree = remote.fetch_tree().await?;
    let collector = ChangeCollector::new(base, config.paths.clone());
    let changes = collector.collect(&tree)?;

    if changes.is_empty() {
        println!("Up to date with {}@{}", remote.repository(), remote.branch());
        return Ok(());
    }

    for (path, change) in changes.iter() {
        let marker = match change {
            Change::Delete => "D",
            Change::Write(_) if tree.sha_for(path).is_some() => "M",
            Change::Write(_) => "A",
        };
        println!("{} {}", marker, path);
    }
    println!("{} change(s) pending", changes.len());
    Ok(())
}

async fn sync(
    remote: &GitHubRemote,
    config: &SyncConfig,
    base: &std::path::Path,
    message: &str,
) -> Result<()> {
    let tree = remote.fetch_tree().await?;
    let collector = ChangeCollector::new(base, config.paths.clone());
    let changes = collector.collect(&tree)?;

    if changes.is_empty() {
        println!("Up to date with {}@{}", remote.repository(), remote.branch());
        return Ok(());
    }

    let files = changes.len();
    let sha = remote.commit_changes(&changes, message, None).await?;
    println!("Committed {} ({} file(s) changed)", sha, files);
    Ok(())
}
