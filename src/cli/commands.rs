//! Command implementations cho repodeck CLI.
//!
//! Các commands chính:
//! - login / logout / whoami: token handling
//! - list: browse and search repositories
//! - download / upload: run a sync job and render its summary
//! - tree: browse a repository without downloading it
//! - create: new repository under the authenticated user
//! - config: write or show repodeck.toml

use super::UploadArgs;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use repodeck::config::{Config, DEFAULT_COMMIT_MESSAGE};
use repodeck::credentials::{self, TokenSource};
use repodeck::github::{
    search_repositories, ApiError, GitHubApi, GitHubClient, NewRepository, RepoSpec,
    RepositoryRef, TreeEntryKind, Visibility,
};
use repodeck::sync::{self, FileOutcome, JobStatus, RateLimitPolicy, SyncJob};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Build the client with the one token for this process.
/// A missing token is not an error here; the first API call reports it.
fn connect(token: Option<&str>, config: &Config) -> Result<GitHubClient> {
    let token = match credentials::resolve_token(token, config) {
        Some(creds) => {
            tracing::debug!(source = %creds.source, "using GitHub token");
            creds.token
        }
        None => {
            warn!("no GitHub token configured, requests will be unauthenticated");
            String::new()
        }
    };

    let client =
        GitHubClient::with_api_url(token, &config.api_url).context("Cannot create GitHub client")?;
    tracing::debug!(api = client.api_url(), "GitHub client ready");
    Ok(client)
}

/// Resolve `name` / `owner/name` to a fetched repository reference.
fn resolve_repo(client: &GitHubClient, spec: &RepoSpec) -> Result<RepositoryRef> {
    let login = match spec.owner {
        Some(_) => String::new(),
        None => client.authenticated_user()?.login,
    };
    let owner = spec.owner_or(&login);

    match client.get_repository(owner, &spec.name) {
        Ok(repo) => Ok(repo),
        Err(ApiError::NotFound(_)) => bail!("Repository {}/{} not found", owner, spec.name),
        Err(e) => Err(e.into()),
    }
}

/// Prompt cho token (không hiển thị input)
fn prompt_token() -> Result<String> {
    print!("GitHub Personal Access Token: ");
    io::stdout().flush()?;

    let token = rpassword::read_password().context("Cannot read token")?;
    if token.trim().is_empty() {
        bail!("Token cannot be empty");
    }
    Ok(token.trim().to_string())
}

pub fn login(token: Option<&str>, config: &Config) -> Result<()> {
    println!("{}", "GitHub Authentication".cyan().bold());

    let token = match token {
        Some(t) => t.trim().to_string(),
        None => prompt_token()?,
    };

    if !credentials::validate_pat_format(&token) {
        bail!("Invalid GitHub PAT format (expected ghp_... or github_pat_...)");
    }

    let client = GitHubClient::with_api_url(token.clone(), &config.api_url)?;
    let user = client
        .authenticated_user()
        .context("GitHub authentication failed")?;
    println!(
        "  {} Authenticated as {}",
        "✓".green(),
        user.login.cyan().bold()
    );

    credentials::save_to_keyring(&token)?;
    println!("  {} Token saved to {}", "✓".green(), TokenSource::Keyring);
    Ok(())
}

pub fn logout() -> Result<()> {
    if credentials::delete_from_keyring()? {
        println!("  {} Token removed from {}", "✓".green(), TokenSource::Keyring);
    } else {
        println!("{}", "No stored token.".yellow());
    }
    Ok(())
}

pub fn whoami(token: Option<&str>, config: &Config) -> Result<()> {
    let client = connect(token, config)?;
    let user = client.authenticated_user()?;

    println!("{}", user.display_name().white().bold());
    println!("  {:<16} {}", "GitHub:".dimmed(), user.login.cyan());
    if let Some(email) = &user.email {
        println!("  {:<16} {}", "Email:".dimmed(), email);
    }
    println!("  {:<16} {}", "Public repos:".dimmed(), user.public_repos);
    println!("  {:<16} {}", "Private repos:".dimmed(), user.total_private_repos);
    println!("  {:<16} {}", "Total:".dimmed(), user.total_repos().to_string().bold());
    Ok(())
}

pub fn list(
    token: Option<&str>,
    config: &Config,
    visibility: Visibility,
    search: Option<&str>,
) -> Result<()> {
    let client = connect(token, config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Loading repositories...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let repos = client.list_repositories(visibility);
    spinner.finish_and_clear();
    let repos = repos?;

    let shown = search_repositories(&repos, search.unwrap_or(""));
    if shown.is_empty() {
        println!("{}", "No repositories found.".yellow());
        return Ok(());
    }

    println!(
        "\n{} {} of {} repositories:\n",
        "Showing".green(),
        shown.len().to_string().green().bold(),
        repos.len()
    );

    for (idx, repo) in shown.iter().enumerate() {
        let lock = if repo.private { " [private]".yellow() } else { "".normal() };
        println!(
            "  {}. {}{}  {}",
            (idx + 1).to_string().cyan(),
            repo.full_name.white().bold(),
            lock,
            format!(
                "★ {}  ⑂ {}  {}",
                repo.stars,
                repo.forks,
                repo.language.as_deref().unwrap_or("-")
            )
            .dimmed()
        );
        if let Some(description) = &repo.description {
            println!("     {}", description);
        }
        if let Some(updated) = repo.updated_at {
            println!(
                "     {}",
                format!("updated {}", updated.format("%Y-%m-%d")).dimmed()
            );
        }
    }

    println!();
    Ok(())
}

pub fn download(
    token: Option<&str>,
    config: &Config,
    spec: &RepoSpec,
    dest: Option<&Path>,
) -> Result<()> {
    let client = connect(token, config)?;
    let repo = resolve_repo(&client, spec)?;

    let destination = match dest {
        Some(d) => d.to_path_buf(),
        None => config.download_dir.join(&repo.name),
    };

    println!(
        "{} {} -> {}",
        "Downloading".cyan().bold(),
        repo.full_name(),
        destination.display()
    );

    let bar = job_progress_bar();
    let job = sync::start_download(
        &client,
        &repo,
        &destination,
        &config.sync_options(),
        |job, outcome| {
            bar.set_length(job.total_files() as u64);
            bar.set_position(job.outcomes().len() as u64);
            bar.set_message(outcome.path.clone());
        },
    );
    bar.finish_and_clear();

    report(&job?)
}

pub fn upload(token: Option<&str>, config: &Config, args: &UploadArgs) -> Result<()> {
    if let Some(missing) = args.sources.iter().find(|p| !p.exists()) {
        bail!("Source not found: {}", missing.display());
    }
    let client = connect(token, config)?;

    let repo = if args.create {
        if args.repo.owner.is_some() {
            bail!("--create only creates repositories under your own account; pass a bare name");
        }
        let request = NewRepository {
            name: args.repo.name.clone(),
            description: args.description.clone().unwrap_or_default(),
            private: args.private,
            auto_init: true,
        };
        let created = client.create_repository(&request)?;
        println!("  {} Created: {}", "✓".green(), created.html_url);
        created.to_ref()
    } else {
        resolve_repo(&client, &args.repo)?
    };

    let mut options = config.sync_options();
    if let Some(message) = &args.message {
        options.commit_message = message.clone();
    }
    if args.stop_on_rate_limit {
        options.rate_limit = RateLimitPolicy::Stop;
    }

    let sources: Vec<String> = args
        .sources
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    println!(
        "{} {} -> {} ({})",
        "Uploading".cyan().bold(),
        sources.join(", "),
        repo.full_name(),
        repo.default_branch
    );

    let bar = job_progress_bar();
    let progress = |job: &SyncJob, outcome: &FileOutcome| {
        bar.set_length(job.total_files() as u64);
        bar.set_position(job.outcomes().len() as u64);
        bar.set_message(outcome.path.clone());
    };
    let job = match args.sources.as_slice() {
        [dir] if dir.is_dir() => sync::start_upload(&client, dir, &repo, &options, progress),
        sources => sync::collect_sources(sources).and_then(|entries| {
            sync::start_upload_entries(&client, &repo, entries, &options, progress)
        }),
    };
    bar.finish_and_clear();

    report(&job?)
}

pub fn tree(token: Option<&str>, config: &Config, spec: &RepoSpec, dir: &str) -> Result<()> {
    let client = connect(token, config)?;
    let repo = resolve_repo(&client, spec)?;

    let tree = match client.get_tree(&repo) {
        Ok(tree) => tree,
        Err(ApiError::Conflict(_)) => {
            println!("{}", "Repository is empty.".yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let children = tree.children(dir);
    if children.is_empty() {
        bail!("Path not found in {}: {}", repo.full_name(), dir);
    }

    println!(
        "{} {}:{}\n",
        repo.full_name().white().bold(),
        repo.default_branch.cyan(),
        if dir.is_empty() { "/" } else { dir }
    );
    for entry in children {
        match entry.kind {
            TreeEntryKind::Tree => println!("  {}/", entry.name().blue().bold()),
            TreeEntryKind::Commit => println!("  {} {}", entry.name(), "(submodule)".dimmed()),
            TreeEntryKind::Blob => println!(
                "  {}  {}",
                entry.name(),
                format!("{} bytes", entry.size.unwrap_or(0)).dimmed()
            ),
        }
    }

    if tree.truncated {
        println!("\n{}", "GitHub truncated this listing; some entries are missing.".yellow());
    }
    Ok(())
}

pub fn create(
    token: Option<&str>,
    config: &Config,
    name: &str,
    private: bool,
    description: Option<&str>,
) -> Result<()> {
    let client = connect(token, config)?;
    let request = NewRepository {
        name: name.to_string(),
        description: description.unwrap_or_default().to_string(),
        private,
        auto_init: true,
    };

    let repo = client.create_repository(&request)?;
    println!("  {} Created: {}", "✓".green(), repo.html_url);
    println!("     {}", repo.clone_url.dimmed());
    Ok(())
}

fn job_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}

/// Print the job summary; a `Failed` job is a command error.
fn report(job: &SyncJob) -> Result<()> {
    let verb = match job.direction() {
        sync::Direction::Download => "Downloaded",
        sync::Direction::Upload => "Uploaded",
    };

    println!(
        "\n{} {}/{} files ({} bytes)",
        verb.green(),
        job.succeeded_count().to_string().cyan(),
        job.total_files(),
        job.bytes_transferred()
    );

    if job.failed_count() > 0 {
        println!(
            "{} {} file(s):",
            "Failed".red(),
            job.failed_count().to_string().red().bold()
        );
        for (path, failure) in job.failures() {
            println!(
                "  {} {} [{}] {}",
                "✗".red(),
                path,
                failure.kind.to_string().yellow(),
                failure.reason.dimmed()
            );
        }
    }

    if let Some(cause) = job.aborted() {
        println!("{} stopped early: {}", "Job".yellow(), cause);
    }

    match job.status() {
        JobStatus::Failed => bail!("{} {} failed", verb, job.repo().full_name()),
        _ => {
            println!("\n{}", "Done!".green().bold());
            Ok(())
        }
    }
}

/// Write a default `repodeck.toml`.
pub fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("  {} Config written: {}", "✓".green(), path.display());
    Ok(())
}

pub fn config_show(path: &Path, config: &Config) -> Result<()> {
    let status = if path.exists() { "" } else { " (not created, using defaults)" };
    println!("{}{}", path.display().to_string().white().bold(), status.dimmed());

    let token = if config.token().is_some() { "set" } else { "not set" };
    println!("  {:<16} {}", "default_pat:".dimmed(), token);
    println!("  {:<16} {}", "api_url:".dimmed(), config.api_url);
    println!("  {:<16} {}", "download_dir:".dimmed(), config.download_dir.display());
    println!("  {:<16} {}", "log_level:".dimmed(), config.log_level);
    match config.log_dir() {
        Some(dir) => println!("  {:<16} {}", "log_dir:".dimmed(), dir.display()),
        None => println!("  {:<16} {}", "log_dir:".dimmed(), "off"),
    }
    println!("  {:<16} {:?}", "sync.rate_limit:".dimmed(), config.sync.rate_limit);
    let message = if config.sync.commit_message == DEFAULT_COMMIT_MESSAGE {
        format!("{} (default)", config.sync.commit_message)
    } else {
        config.sync.commit_message.clone()
    };
    println!("  {:<16} {}", "commit_message:".dimmed(), message);
    Ok(())
}
