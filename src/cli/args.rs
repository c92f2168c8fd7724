//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Trace every coordinator step on stderr
//! - `--quiet` / `-q`: Errors only
//! - `--timeout <secs>`: Give up (with `Cancelled`) after this long

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pool - claim and release locks kept in a git repository
#[derive(Parser, Debug)]
#[command(name = "pool")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Trace every coordinator step on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Cancel the operation after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    // ========== Resource protocol (JSON on stdin) ==========
    /// List new versions of a pool
    #[command(
        name = "check",
        long_about = "List new versions of a pool.\n\n\
            Reads {\"source\": ..., \"version\": ...} on stdin and prints the versions \
            that touched the pool, oldest first. Without a version only the latest \
            is printed."
    )]
    Check,

    /// Fetch the lock behind a version into a directory
    #[command(
        name = "in",
        long_about = "Fetch the lock behind a version.\n\n\
            Reads {\"source\": ..., \"version\": {\"ref\": ...}} on stdin, writes the \
            lock name to <DESTINATION>/name and its payload to <DESTINATION>/metadata."
    )]
    In {
        /// Directory to write `name` and `metadata` into
        destination: PathBuf,
    },

    /// Acquire or release a lock
    #[command(
        name = "out",
        long_about = "Acquire or release a lock.\n\n\
            Reads {\"source\": ..., \"params\": ...} on stdin. With empty params or \
            {\"acquire\": true} a random unclaimed lock is claimed. With \
            {\"release\": \"<dir>\"} the lock named in <SOURCES>/<dir>/name is released.",
        after_help = "\
EXAMPLES:
    # Claim a lock
    echo '{\"source\": {\"uri\": \"git@example.com:locks.git\", \"branch\": \"main\", \"pool\": \"aws\"}, \"params\": {\"acquire\": true}}' | pool out .

    # Release the lock fetched into ./my-lock
    echo '{\"source\": {...}, \"params\": {\"release\": \"my-lock\"}}' | pool out ."
    )]
    Out {
        /// Directory containing the inputs named by `params.release`
        sources: PathBuf,
    },

    // ========== Direct commands ==========
    /// Claim a lock and print it
    Claim {
        #[command(flatten)]
        repo: RepoArgs,

        #[command(flatten)]
        retry: RetryArgs,

        /// Also write `name` and `metadata` into this directory
        #[arg(long, value_name = "DIR")]
        destination: Option<PathBuf>,
    },

    /// Release a claimed lock
    Release {
        #[command(flatten)]
        repo: RepoArgs,

        #[command(flatten)]
        retry: RetryArgs,

        /// Lock to release
        #[arg(long)]
        lock: String,
    },

    /// Show the lock a version claimed or released
    Resolve {
        #[command(flatten)]
        repo: RepoArgs,

        /// Version id to resolve
        #[arg(long = "version", value_name = "REF")]
        reference: String,

        /// Also write `name` and `metadata` into this directory
        #[arg(long, value_name = "DIR")]
        destination: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Where the pool repository lives.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Repository URL or path
    #[arg(long)]
    pub uri: String,

    /// Branch holding the pools
    #[arg(long, default_value = "master")]
    pub branch: String,

    /// Pool name (inferred from the version by `resolve` when omitted)
    #[arg(long)]
    pub pool: Option<String>,

    /// File containing an SSH private key for the remote
    #[arg(long, value_name = "PATH")]
    pub private_key: Option<PathBuf>,
}

/// Overrides for the retry policy.
#[derive(Args, Debug, Clone, Default)]
pub struct RetryArgs {
    /// Attempts before giving up under contention
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Delay between attempts, e.g. "500ms" or "10s"
    #[arg(long)]
    pub retry_delay: Option<String>,

    /// Keep retrying while the pool is empty
    #[arg(long)]
    pub wait_for_lock: bool,
}

/// Shells supported by `completion`.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_resource_commands() {
        let cli = Cli::try_parse_from(["pool", "in", "/tmp/dest"]).unwrap();
        assert!(matches!(cli.command, Command::In { destination } if destination == PathBuf::from("/tmp/dest")));

        let cli = Cli::try_parse_from(["pool", "--timeout", "30", "out", "."]).unwrap();
        assert_eq!(cli.timeout, Some(30));
        assert!(matches!(cli.command, Command::Out { .. }));
    }

    #[test]
    fn parses_claim_flags() {
        let cli = Cli::try_parse_from([
            "pool",
            "claim",
            "--uri",
            "/srv/locks.git",
            "--pool",
            "aws",
            "--max-attempts",
            "3",
            "--wait-for-lock",
            "--debug",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Command::Claim { repo, retry, destination } => {
                assert_eq!(repo.branch, "master");
                assert_eq!(repo.pool.as_deref(), Some("aws"));
                assert_eq!(retry.max_attempts, Some(3));
                assert!(retry.wait_for_lock);
                assert!(destination.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn release_requires_lock() {
        assert!(Cli::try_parse_from(["pool", "release", "--uri", "u", "--pool", "p"]).is_err());
    }
}
