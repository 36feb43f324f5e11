//! CLI definitions và command implementations cho repodeck.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use repodeck::github::{RepoSpec, Visibility};
use std::path::PathBuf;

/// repodeck - GitHub repository manager
#[derive(Parser)]
#[command(name = "repodeck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// GitHub Personal Access Token (overrides GITHUB_TOKEN, config and keyring)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Path to repodeck.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify a token and store it in the system keyring
    Login,

    /// Remove the stored token from the system keyring
    Logout,

    /// Show the authenticated user and repository counts
    Whoami,

    /// List your repositories
    List {
        #[arg(long, value_enum, default_value_t = Visibility::All)]
        visibility: Visibility,

        /// Filter by name, description or language
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Download a repository's files into a local folder
    Download {
        /// `name`, `owner/name` or a GitHub URL
        repo: RepoSpec,

        /// Destination folder (default: <download_dir>/<name>)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },

    /// Browse a repository's files without downloading them
    Tree {
        /// `name`, `owner/name` or a GitHub URL
        repo: RepoSpec,

        /// Directory inside the repository (default: root)
        path: Option<String>,
    },

    /// Upload folders or files to a repository, one commit per file
    Upload(UploadArgs),

    /// Create a new repository
    Create {
        name: String,

        #[arg(long)]
        private: bool,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Manage repodeck.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Args)]
pub struct UploadArgs {
    /// Target `name`, `owner/name` or GitHub URL
    pub repo: RepoSpec,

    /// Folders and/or files to upload. A file goes to the repository root.
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Create the repository first (under your account)
    #[arg(long)]
    pub create: bool,

    /// Make the created repository private
    #[arg(long, requires = "create")]
    pub private: bool,

    /// Description for the created repository
    #[arg(short, long, requires = "create")]
    pub description: Option<String>,

    /// Commit message (default from config)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Stop at the first rate-limited file instead of continuing
    #[arg(long)]
    pub stop_on_rate_limit: bool,
}
