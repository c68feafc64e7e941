use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use crate::config::CollectorConfig;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::models::{CommitRecord, Repository};
use crate::storage::Storage;

pub struct CommitCollector {
    github: GitHubClient,
    storage: Storage,
    config: CollectorConfig,
}

/// Commits gathered in one run plus the repositories that had to be skipped.
#[derive(Debug, Default)]
pub struct Collected {
    pub commits: Vec<CommitRecord>,
    pub repositories: usize,
    pub skipped: Vec<String>,
}

#[derive(Debug)]
pub struct CollectionReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub repositories: usize,
    pub skipped: Vec<String>,
    pub total_commits: usize,
    /// `None` when nothing was collected and no file was written.
    pub output: Option<PathBuf>,
}

impl CommitCollector {
    pub fn new(github: GitHubClient, storage: Storage, config: &CollectorConfig) -> Self {
        Self {
            github,
            storage,
            config: config.clone(),
        }
    }

    pub async fn run(&self) -> Result<CollectionReport> {
        let started_at = Local::now();
        tracing::info!("Starting commit collection at {}", started_at);

        let collected = self.collect().await?;

        let output = if collected.commits.is_empty() {
            tracing::warn!("No commits collected for {}; nothing written", self.config.account);
            None
        } else {
            Some(self.storage.save_commits(&collected.commits)?)
        };

        let finished_at = Local::now();
        tracing::info!(
            "Collection completed at {} ({} commits)",
            finished_at,
            collected.commits.len()
        );

        Ok(CollectionReport {
            started_at,
            finished_at,
            repositories: collected.repositories,
            skipped: collected.skipped,
            total_commits: collected.commits.len(),
            output,
        })
    }

    pub async fn collect(&self) -> Result<Collected> {
        if let Some(full_name) = self.config.repository_full_name() {
            tracing::info!("Collecting commits for single repository {}", full_name);
            let commits = self.fetch_repository(&full_name).await?;
            return Ok(Collected {
                commits,
                repositories: 1,
                skipped: Vec::new(),
            });
        }

        let repositories = self.discover_repositories().await?;
        tracing::info!("Found {} repositories", repositories.len());

        let pb = ProgressBar::new(repositories.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut collected = Collected {
            repositories: repositories.len(),
            ..Collected::default()
        };

        for (i, repo) in repositories.iter().enumerate() {
            tracing::info!(
                "Processing repository {}/{}: {}",
                i + 1,
                repositories.len(),
                repo.full_name
            );

            match self.fetch_repository(&repo.full_name).await {
                Ok(commits) => collected.commits.extend(commits),
                Err(e) if e.is_http_failure() => {
                    tracing::warn!("Skipping {}: {}", repo.full_name, e);
                    collected.skipped.push(repo.full_name.clone());
                }
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message("Fetched all repositories");
        Ok(collected)
    }

    async fn discover_repositories(&self) -> Result<Vec<Repository>> {
        let entity = self.github.resolve_entity(&self.config.account).await?;

        match self.github.get_repositories(&entity).await {
            Err(e) if e.status() == Some(404) => {
                tracing::warn!("No repositories found for {} {}", entity.kind, entity.name);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn fetch_repository(&self, full_name: &str) -> Result<Vec<CommitRecord>> {
        let commits = self.github.get_commits(full_name).await?;
        tracing::info!("Total commits for {}: {}", full_name, commits.len());

        Ok(commits
            .iter()
            .map(|commit| CommitRecord::from_github(full_name, commit))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::github::HttpResponse;
    use crate::test_support::{RecordingDelay, ScriptedTransport};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config(repository: Option<&str>) -> CollectorConfig {
        CollectorConfig {
            token: "t0ken".to_string(),
            account: "acme".to_string(),
            repository: repository.map(str::to_string),
            api_url: "https://api.github.com".to_string(),
        }
    }

    fn collector(
        transport: &Arc<ScriptedTransport>,
        dir: &TempDir,
        repository: Option<&str>,
    ) -> CommitCollector {
        let github = GitHubClient::with_transport(
            transport.clone(),
            Arc::new(RecordingDelay::default()),
            "https://api.github.com",
        );
        CommitCollector::new(github, Storage::new(dir.path()).unwrap(), &config(repository))
    }

    fn commit_json(sha: &str, message: &str) -> String {
        format!(
            r#"{{"sha":"{}","html_url":"https://github.com/x/{}","commit":{{"message":"{}","author":{{"name":"Ada","date":"2024-01-01T00:00:00Z"}}}}}}"#,
            sha, sha, message
        )
    }

    #[tokio::test]
    async fn test_failing_repository_is_skipped() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            HttpResponse::new(200, r#"{"login":"acme"}"#),
            HttpResponse::new(
                200,
                r#"[{"full_name":"acme/empty"},{"full_name":"acme/widgets"}]"#,
            ),
            HttpResponse::new(409, r#"{"message":"Git Repository is empty."}"#),
            HttpResponse::new(200, format!("[{}]", commit_json("a1", "feat: one\\nbody"))),
        ]));
        let dir = TempDir::new().unwrap();

        let collected = collector(&transport, &dir, None).collect().await.unwrap();

        assert_eq!(collected.repositories, 2);
        assert_eq!(collected.skipped, vec!["acme/empty".to_string()]);
        assert_eq!(collected.commits.len(), 1);
        assert_eq!(collected.commits[0].repository, "acme/widgets");
        assert_eq!(collected.commits[0].commit_message, "feat: one body");
    }

    #[tokio::test]
    async fn test_unreachable_repository_is_skipped() {
        let transport = Arc::new(ScriptedTransport::with_steps(vec![
            Some(HttpResponse::new(200, r#"{"login":"acme"}"#)),
            Some(HttpResponse::new(
                200,
                r#"[{"full_name":"acme/down"},{"full_name":"acme/widgets"}]"#,
            )),
            None,
            Some(HttpResponse::new(200, format!("[{}]", commit_json("c3", "chore: bump")))),
        ]));
        let dir = TempDir::new().unwrap();

        let collected = collector(&transport, &dir, None).collect().await.unwrap();

        assert_eq!(collected.skipped, vec!["acme/down".to_string()]);
        assert_eq!(collected.commits.len(), 1);
        assert_eq!(collected.commits[0].commit_sha, "c3");
    }

    #[tokio::test]
    async fn test_missing_repository_listing_yields_no_commits() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            HttpResponse::new(404, r#"{"message":"Not Found"}"#),
            HttpResponse::new(404, r#"{"message":"Not Found"}"#),
        ]));
        let dir = TempDir::new().unwrap();

        let report = collector(&transport, &dir, None).run().await.unwrap();

        assert_eq!(report.total_commits, 0);
        assert!(report.output.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(
            transport.requested()[1],
            "https://api.github.com/users/acme/repos?per_page=100"
        );
    }

    #[tokio::test]
    async fn test_repository_listing_error_is_fatal() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            HttpResponse::new(200, r#"{"login":"acme"}"#),
            HttpResponse::new(500, "boom"),
        ]));
        let dir = TempDir::new().unwrap();

        let result = collector(&transport, &dir, None).collect().await;
        assert!(matches!(result, Err(Error::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_single_repository_skips_discovery_and_writes_file() {
        let transport = Arc::new(ScriptedTransport::new(vec![HttpResponse::new(
            200,
            format!(
                "[{},{}]",
                commit_json("a1", "fix: crash"),
                commit_json("b2", "docs")
            ),
        )]));
        let dir = TempDir::new().unwrap();

        let report = collector(&transport, &dir, Some("widgets")).run().await.unwrap();

        assert_eq!(
            transport.requested(),
            vec!["https://api.github.com/repos/acme/widgets/commits?per_page=100"]
        );
        assert_eq!(report.total_commits, 2);
        let output = report.output.unwrap();
        let loaded = Storage::load_commits(&output).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].commit_sha, "b2");
    }
}
