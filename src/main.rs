//! repodeck CLI - GitHub repository manager for the terminal
//!
//! Usage:
//!   repodeck login      - Verify a token and store it in the keyring
//!   repodeck list       - Browse and search your repositories
//!   repodeck download   - Download a repository tree into a local folder
//!   repodeck tree       - Browse a repository's files
//!   repodeck upload     - Upload folders or files, one commit per file

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use repodeck::config::{default_config_path, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    repodeck::logging::init(log_level, config.log_dir().as_deref());

    let token = cli.token.as_deref();

    match cli.command {
        Commands::Login => cli::commands::login(token, &config),
        Commands::Logout => cli::commands::logout(),
        Commands::Whoami => cli::commands::whoami(token, &config),
        Commands::List { visibility, search } => {
            cli::commands::list(token, &config, visibility, search.as_deref())
        }
        Commands::Download { repo, dest } => {
            cli::commands::download(token, &config, &repo, dest.as_deref())
        }
        Commands::Tree { repo, path } => {
            cli::commands::tree(token, &config, &repo, path.as_deref().unwrap_or(""))
        }
        Commands::Upload(args) => cli::commands::upload(token, &config, &args),
        Commands::Create {
            name,
            private,
            description,
        } => cli::commands::create(token, &config, &name, private, description.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => cli::commands::config_init(&config_path, force),
            ConfigAction::Show => cli::commands::config_show(&config_path, &config),
        },
    }
}
