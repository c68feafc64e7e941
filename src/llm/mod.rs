pub mod provider;
pub mod azure;
pub mod prompts;
pub mod parser;
pub mod batcher;

pub use provider::LLMProvider;
pub use azure::AzureOpenAIProvider;
pub use prompts::RatingRequest;
pub use batcher::CommitBatcher;
