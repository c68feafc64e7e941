use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4.1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-07-01-preview";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub github_account: Option<String>,
    pub github_repo: Option<String>,
    pub github_api_url: String,
    pub azure_endpoint: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_deployment: String,
    pub azure_api_version: String,
    pub output_dir: PathBuf,
    /// Raw `RATING_BATCH_SIZE`, validated when the rater settings are built.
    pub batch_size: Option<String>,
    /// Raw `TOP_COMMITS`, validated alongside the batch size.
    pub top_count: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            github_token: get("GITHUB_TOKEN"),
            github_account: get("GITHUB_ORG"),
            github_repo: get("GITHUB_REPO"),
            github_api_url: get("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            azure_endpoint: get("AZURE_OPENAI_ENDPOINT"),
            azure_api_key: get("AZURE_OPENAI_API_KEY"),
            azure_deployment: get("AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string()),
            azure_api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            batch_size: get("RATING_BATCH_SIZE"),
            top_count: get("TOP_COMMITS"),
        })
    }
}

/// Settings for the forge side of a run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub token: String,
    pub account: String,
    pub repository: Option<String>,
    pub api_url: String,
}

impl CollectorConfig {
    /// Full `owner/repo` name of the pre-designated repository, if any.
    pub fn repository_full_name(&self) -> Option<String> {
        self.repository.as_ref().map(|repo| {
            if repo.contains('/') {
                repo.clone()
            } else {
                format!("{}/{}", self.account, repo)
            }
        })
    }
}

impl TryFrom<&Config> for CollectorConfig {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        let token = config
            .github_token
            .clone()
            .ok_or_else(|| Error::Config("GITHUB_TOKEN environment variable not set".to_string()))?;
        let account = config
            .github_account
            .clone()
            .ok_or_else(|| Error::Config("GITHUB_ORG environment variable not set".to_string()))?;

        Ok(Self {
            token,
            account,
            repository: config.github_repo.clone(),
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl TryFrom<&Config> for AzureConfig {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        let endpoint = config.azure_endpoint.clone().ok_or_else(|| {
            Error::Config("AZURE_OPENAI_ENDPOINT environment variable not set".to_string())
        })?;
        let api_key = config.azure_api_key.clone().ok_or_else(|| {
            Error::Config("AZURE_OPENAI_API_KEY environment variable not set".to_string())
        })?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment: config.azure_deployment.clone(),
            api_version: config.azure_api_version.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RaterConfig {
    pub batch_size: usize,
    pub max_attempts: u32,
    pub top_count: usize,
}

impl Default for RaterConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_attempts: 3,
            top_count: 10,
        }
    }
}

impl TryFrom<&Config> for RaterConfig {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            batch_size: positive_or(&config.batch_size, "RATING_BATCH_SIZE", defaults.batch_size)?,
            top_count: positive_or(&config.top_count, "TOP_COMMITS", defaults.top_count)?,
            ..defaults
        })
    }
}

fn positive_or(value: &Option<String>, name: &str, default: usize) -> Result<usize> {
    match value {
        Some(v) => v
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| Error::Config(format!("{} must be a positive integer, got '{}'", name, v))),
        None => Ok(default),
    }
}
