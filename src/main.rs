use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commitrank::models::RatedCommit;
use commitrank::pipeline::{top_rated, CollectionReport, RatingReport};
use commitrank::{
    AzureConfig, AzureOpenAIProvider, CollectorConfig, CommitCollector, CommitRater, Config,
    GitHubClient, LLMProvider, RaterConfig, Storage,
};

#[derive(Parser, Debug)]
#[command(name = "commitrank")]
#[command(version = "0.1.0")]
#[command(about = "Export GitHub commit history and rate commit message quality")]
struct Args {
    /// Directory for exported and rated CSV files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export every commit of an organization's or user's repositories
    Collect {
        /// Organization or user name (overrides GITHUB_ORG)
        #[arg(short, long)]
        account: Option<String>,

        /// Only export this repository, as `owner/repo` or a name under the account
        #[arg(short, long)]
        repo: Option<String>,
    },
    /// Rate commit messages from the newest export
    Rate {
        /// Commits file to rate (defaults to the newest commits_*.csv)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Commits per LLM request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Number of top commits to print
        #[arg(long)]
        top: Option<usize>,

        /// Skip the connectivity check before rating
        #[arg(long)]
        skip_check: bool,
    },
    /// Check connectivity to the LLM endpoint
    Check,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("Error in main process: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("commitrank=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    match args.command {
        Command::Collect { account, repo } => {
            if account.is_some() {
                config.github_account = account;
            }
            if repo.is_some() {
                config.github_repo = repo;
            }
            collect(&config).await
        }
        Command::Rate {
            input,
            batch_size,
            top,
            skip_check,
        } => {
            if let Some(batch_size) = batch_size {
                config.batch_size = Some(batch_size.to_string());
            }
            if let Some(top) = top {
                config.top_count = Some(top.to_string());
            }
            rate(&config, input, skip_check).await
        }
        Command::Check => {
            let llm = AzureOpenAIProvider::new(&AzureConfig::try_from(&config)?)?;
            anyhow::ensure!(
                check_connection(&llm).await,
                "Failed to establish connection to {}",
                llm.name()
            );
            Ok(())
        }
    }
}

async fn collect(config: &Config) -> anyhow::Result<()> {
    let collector_config = CollectorConfig::try_from(config)?;
    let github = GitHubClient::new(&collector_config)?;
    let storage = Storage::new(&config.output_dir)?;

    let collector = CommitCollector::new(github, storage, &collector_config);
    let report = collector.run().await?;
    print_collection(&report);
    Ok(())
}

async fn rate(config: &Config, input: Option<PathBuf>, skip_check: bool) -> anyhow::Result<()> {
    let rater_config = RaterConfig::try_from(config)?;
    let llm = AzureOpenAIProvider::new(&AzureConfig::try_from(config)?)?;
    if !skip_check {
        anyhow::ensure!(
            check_connection(&llm).await,
            "Failed to connect to {} - cannot proceed",
            llm.name()
        );
    }

    let storage = Storage::new(&config.output_dir)?;
    let input = match input {
        Some(path) => path,
        None => storage.latest_commits_file()?,
    };
    let commits = Storage::load_commits(&input)?;
    if commits.is_empty() {
        println!("No commits to rate in {}", input.display());
        return Ok(());
    }

    println!("Rating {} commits from {}...", commits.len(), input.display());
    let rater = CommitRater::new(llm, &rater_config);
    let report = rater.rate(&commits).await;

    let output = storage.save_rated(&report.commits)?;
    println!("Saved rated commits to {}", output.display());
    print_rating(&report);
    print_top_commits(&top_rated(&report.commits, rater_config.top_count), rater_config.top_count);
    Ok(())
}

async fn check_connection(llm: &impl LLMProvider) -> bool {
    tracing::info!("Testing {} connection...", llm.name());
    match llm.list_models().await {
        Ok(models) => {
            tracing::info!("Connection successful. Available models:");
            for model in models {
                tracing::info!(" - {}", model);
            }
            true
        }
        Err(e) => {
            tracing::error!("Connection test failed: {}", e);
            false
        }
    }
}

fn print_collection(report: &CollectionReport) {
    println!("\nCollection completed at {}", report.finished_at);
    println!("Total time: {}", format_duration(report.finished_at - report.started_at));
    println!("Repositories processed: {}", report.repositories);
    if !report.skipped.is_empty() {
        println!("Repositories skipped: {}", report.skipped.join(", "));
    }
    println!("Total commits collected: {}", report.total_commits);
    match &report.output {
        Some(path) => println!("Results saved to: {}", path.display()),
        None => println!("No commits found; nothing written."),
    }
}

fn print_rating(report: &RatingReport) {
    println!(
        "Batches rated: {}, failed: {}",
        report.scored_batches, report.exhausted_batches
    );
}

fn print_top_commits(commits: &[&RatedCommit], count: usize) {
    println!("\n===== TOP {} QUALITY COMMITS =====\n", count);

    for (i, commit) in commits.iter().enumerate() {
        println!("{}. Score: {}/10", i + 1, commit.quality_score);
        println!("   Message: {}", commit.commit_message);
        println!("   Author: {}", commit.author);
        println!("   Repository: {}", commit.repository);
        println!("   Date: {}", commit.date);
        println!("   Reason: {}", commit.quality_reason);
        println!();
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
