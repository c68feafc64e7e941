use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error ({status}) for {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No {0} files found in {1}")]
    NoInputFile(String, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Failures the collector may skip for a single repository.
    pub fn is_http_failure(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
