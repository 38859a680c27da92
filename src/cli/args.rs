//! cli::args
//!
//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mirror content changes to a GitHub branch as atomic commits.
#[derive(Debug, Parser)]
#[command(name = "ghsync", version, about)]
pub struct Cli {
    /// Path to the config file (default: standard search locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local base path the tracked roots resolve against
    #[arg(long, global = true, value_name = "DIR")]
    pub base: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify repository access and token permissions
    Check,

    /// Show the changes a sync would commit, without committing
    Diff,

    /// Run one sync pass immediately (bypasses the event batcher)
    Sync {
        /// Commit message for the manual sync
        #[arg(short, long, default_value = "Manual content sync")]
        message: String,
    },
}

impl Cli {
    /// Parse from the process arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check() {
        let cli = Cli::try_parse_from(["ghsync", "check"]).unwrap();
        assert!(matches!(cli.command, Command::Check));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_global_flags() {
        let cli = Cli::try_parse_from([
            "ghsync",
            "diff",
            "--config",
            "/etc/ghsync.toml",
            "--base",
            "/srv/site",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Diff));
        assert_eq!(cli.config.unwrap().to_str().unwrap(), "/etc/ghsync.toml");
        assert_eq!(cli.base.unwrap().to_str().unwrap(), "/srv/site");
    }

    #[test]
    fn sync_message_defaults() {
        let cli = Cli::try_parse_from(["ghsync", "sync"]).unwrap();
        match cli.command {
            Command::Sync { message } => assert_eq!(message, "Manual content sync"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn sync_message_override() {
        let cli = Cli::try_parse_from(["ghsync", "sync", "-m", "Restore deleted post"]).unwrap();
        match cli.command {
            Command::Sync { message } => assert_eq!(message, "Restore deleted post"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
