//! committer - CLI entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use git2::Repository;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use committer::changes::open_repository;
use committer::config::Config;
use committer::gateway::{self, Backend};
use committer::generate::{NO_CHANGES_MESSAGE, Outcome, generate, render_prompt};
use committer::git::{push_all, push_targets, stage_and_commit};

/// Generate commit messages for pending changes.
#[derive(Parser, Debug)]
#[command(name = "committer")]
#[command(about = "Generate commit messages for pending changes")]
#[command(version)]
struct Cli {
    /// Path to config file (defaults to ~/.config/committer/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage all changes and generate a commit message for them
    #[command(visible_alias = "gen")]
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Commit with the generated message after confirmation
    #[arg(short, long)]
    commit: bool,

    /// Commit, then push to the configured remotes
    #[arg(short, long)]
    push: bool,

    /// Generation backend (overrides config and environment)
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Print the request payload without contacting a backend
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Generate(args) => run_generate(args, cli.config).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("committer=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_generate(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let repo = open_repository(&cwd)
        .context("Not a git repository. Run committer from within a git repository.")?;

    if args.dry_run {
        // Collects (and stages) exactly what a real run would send.
        match render_prompt(&repo).context("Failed to collect changes")? {
            Some(prompt) => println!("{}", prompt),
            None => println!("{}", NO_CHANGES_MESSAGE),
        }
        return Ok(());
    }

    // Step 1: Select backend
    let mut config = Config::load(config_path.as_deref()).context("Failed to load config")?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }

    // Step 2: Collect changes and generate. The gateway is only built when
    // there is something to describe.
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    pb.set_message(format!("Generating commit message with {}...", config.backend));
    pb.enable_steady_tick(Duration::from_millis(80));

    let result = generate(&repo, || gateway::from_config(&config)).await;
    pb.finish_and_clear();
    let message = match result.context("Failed to generate commit message")? {
        Outcome::NoChanges => {
            println!("{}", NO_CHANGES_MESSAGE);
            return Ok(());
        }
        Outcome::Message(message) => message,
    };

    println!("{}", message);

    if !(args.commit || args.push) {
        return Ok(());
    }

    // Step 3: Commit (and push) after confirmation
    println!();
    let confirmed = Confirm::new()
        .with_prompt("Commit with this message?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")?;

    if !confirmed {
        println!("Aborted. Nothing committed.");
        return Ok(());
    }

    let oid = stage_and_commit(&repo, &message).context("Failed to commit")?;
    println!("✓ Committed {}", short_id(&oid.to_string()));

    if args.push {
        push(&repo, &config.remotes)?;
    }

    Ok(())
}

fn push(repo: &Repository, configured: &[String]) -> Result<()> {
    let workdir = repo
        .workdir()
        .context("Repository has no working directory")?;
    let remotes = push_targets(repo, configured).context("Failed to determine remotes")?;

    if remotes.is_empty() {
        eprintln!("Warning: No remotes configured. Nothing pushed.");
        return Ok(());
    }

    push_all(workdir, &remotes).context("Failed to push")?;
    println!("✓ Pushed to {}", remotes.join(", "));
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
