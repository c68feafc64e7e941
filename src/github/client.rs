use reqwest::{header, Client};
use std::sync::Arc;

use crate::config::CollectorConfig;
use crate::delay::{Delay, TokioDelay};
use crate::error::Result;
use crate::github::paginator::Paginator;
use crate::github::rate_limiter::RateLimiter;
use crate::github::transport::{HttpTransport, ReqwestTransport};
use crate::models::{Entity, EntityKind, GitHubCommit, Repository};

const PER_PAGE: u32 = 100;

pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl GitHubClient {
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.token))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("commitrank/0.1"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self::with_transport(
            Arc::new(ReqwestTransport::new(client)),
            Arc::new(TokioDelay),
            &config.api_url,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        delay: Arc<dyn Delay>,
        base_url: &str,
    ) -> Self {
        Self {
            transport,
            rate_limiter: RateLimiter::new(delay),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Requests the organization endpoint once: 200 means organization, anything else user.
    pub async fn resolve_entity(&self, name: &str) -> Result<Entity> {
        let url = format!("{}/orgs/{}", self.base_url, name);
        let response = self.transport.get(&url).await?;

        let kind = if response.status == 200 {
            EntityKind::Organization
        } else {
            EntityKind::User
        };
        tracing::info!("Resolved {} as {}", name, kind);

        Ok(Entity {
            name: name.to_string(),
            kind,
        })
    }

    pub async fn get_repositories(&self, entity: &Entity) -> Result<Vec<Repository>> {
        let url = format!(
            "{}/{}/{}/repos",
            self.base_url,
            entity.kind.path_segment(),
            entity.name
        );
        tracing::info!("Fetching repositories for {}...", entity.name);
        self.paginator().fetch_all(&url, PER_PAGE).await
    }

    /// Full history of one repository, newest first as the forge returns it.
    pub async fn get_commits(&self, full_name: &str) -> Result<Vec<GitHubCommit>> {
        let url = format!("{}/repos/{}/commits", self.base_url, full_name);
        tracing::info!("Fetching commits for {}...", full_name);
        self.paginator().fetch_all(&url, PER_PAGE).await
    }

    fn paginator(&self) -> Paginator<'_> {
        Paginator::new(self.transport.as_ref(), &self.rate_limiter)
    }
}
