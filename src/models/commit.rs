use serde::{Deserialize, Serialize};

/// Commit as returned by the repository commits endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub commit: CommitDetails,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetails {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
}

/// One row of the commit export. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub repository: String,
    pub commit_sha: String,
    pub commit_message: String,
    pub author: String,
    pub date: String,
    #[serde(default)]
    pub url: String,
}

impl CommitRecord {
    pub fn from_github(repository: &str, commit: &GitHubCommit) -> Self {
        let (author, date) = commit
            .commit
            .author
            .as_ref()
            .map(|a| (a.name.clone(), a.date.clone()))
            .unwrap_or_default();

        Self {
            repository: repository.to_string(),
            commit_sha: commit.sha.clone(),
            commit_message: single_line(&commit.commit.message),
            author,
            date,
            url: commit.html_url.clone().unwrap_or_default(),
        }
    }
}

/// Keeps a message on one CSV row: newlines become spaces, carriage returns are dropped.
pub fn single_line(message: &str) -> String {
    message.replace('\n', " ").replace('\r', "")
}

/// A commit row augmented with its quality rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedCommit {
    pub repository: String,
    pub commit_sha: String,
    pub commit_message: String,
    pub author: String,
    pub date: String,
    pub url: String,
    pub quality_score: u8,
    pub quality_reason: String,
}

impl RatedCommit {
    pub fn new(commit: &CommitRecord, quality_score: u8, quality_reason: impl Into<String>) -> Self {
        Self {
            repository: commit.repository.clone(),
            commit_sha: commit.commit_sha.clone(),
            commit_message: commit.commit_message.clone(),
            author: commit.author.clone(),
            date: commit.date.clone(),
            url: commit.url.clone(),
            quality_score,
            quality_reason: quality_reason.into(),
        }
    }
}
