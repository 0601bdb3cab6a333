use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dossier_core::bootstrap::{AppBuilder, resolve_config_path};
use dossier_index::host::RepoRef;
use dossier_index::indexer::IndexReport;
use dossier_store::{CommitRecord, ProjectId};

/// Index GitHub repositories and summarize their commits with an LLM.
#[derive(Parser, Debug)]
#[command(name = "dossier", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a repository as a project and index its files
    Index {
        /// Repository URL, e.g. <https://github.com/owner/repo>
        url: String,
        /// Project id; a new one is generated when omitted
        #[arg(long)]
        project: Option<String>,
        /// Display name; defaults to owner/repo
        #[arg(long)]
        name: Option<String>,
        /// GitHub token for this run, overrides `DOSSIER_GITHUB_TOKEN`
        #[arg(long)]
        token: Option<String>,
    },
    /// Summarize and store commits not yet recorded for a project
    Poll { project: String },
    /// List stored commits of a project, newest first
    Commits { project: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            Ok(())
        }
    }
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let app = AppBuilder::from_path(config_path)?;
    tracing::debug!(
        config = %app.config_path().display(),
        provider = %app.config().llm.provider,
        store = %app.config().store.sqlite_path,
        "configuration loaded"
    );
    let store = app.build_store().await?;

    match cli.command {
        Command::Index {
            url,
            project,
            name,
            token,
        } => {
            let repo = RepoRef::parse(&url)?;
            let project_id = ProjectId::from(
                project.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            );
            let name = name.unwrap_or_else(|| repo.to_string());
            if store.create_project(&project_id, &name, Some(&url)).await? {
                tracing::info!(project = %project_id, %name, "project registered");
            }

            let indexer = app.build_indexer(
                Arc::new(app.build_host()?),
                Arc::new(app.build_provider()?),
                store,
            );
            let report = indexer
                .index_repository(&project_id, &url, token.as_deref())
                .await
                .with_context(|| format!("indexing {url} failed"))?;
            print_report(&project_id, &report);
        }
        Command::Poll { project } => {
            let project_id = ProjectId::from(project);
            let poller = app.build_poller(
                Arc::new(app.build_host()?),
                Arc::new(app.build_provider()?),
                store,
            );
            let inserted = poller.poll_commits(&project_id).await?;
            println!("{} new commit(s)", inserted.len());
            for commit in &inserted {
                print_commit(commit);
            }
        }
        Command::Commits { project } => {
            let commits = store.load_commits(&ProjectId::from(project)).await?;
            if commits.is_empty() {
                println!("no commits stored");
            }
            for commit in &commits {
                print_commit(commit);
            }
        }
    }
    Ok(())
}

fn print_report(project_id: &ProjectId, report: &IndexReport) {
    println!("project:   {project_id}");
    println!("fetched:   {}", report.files_fetched);
    println!("valid:     {}", report.files_valid);
    println!("succeeded: {}", report.succeeded);
    println!("degraded:  {}", report.degraded);
    println!("failed:    {}", report.failed.len());
    for file in &report.failed {
        println!("  - {file}");
    }
    println!("took:      {}ms", report.duration_ms);
}

fn print_commit(commit: &CommitRecord) {
    let short = commit.commit_hash.get(..7).unwrap_or(&commit.commit_hash);
    let subject = commit.commit_message.lines().next().unwrap_or_default();
    println!("{short} {} {} ({})", commit.commit_date, subject, commit.commit_author_name);
    for line in commit.summary.lines().filter(|l| !l.trim().is_empty()) {
        println!("    {line}");
    }
}
