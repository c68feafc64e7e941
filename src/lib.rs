pub mod config;
pub mod error;
pub mod delay;
pub mod models;
pub mod github;
pub mod llm;
pub mod pipeline;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AzureConfig, CollectorConfig, Config, RaterConfig};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use llm::{AzureOpenAIProvider, LLMProvider};
pub use pipeline::{CommitCollector, CommitRater};
pub use storage::Storage;
