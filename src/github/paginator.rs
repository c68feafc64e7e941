use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::github::rate_limiter::RateLimiter;
use crate::github::transport::HttpTransport;

pub struct Paginator<'a> {
    transport: &'a dyn HttpTransport,
    rate_limiter: &'a RateLimiter,
}

impl<'a> Paginator<'a> {
    pub fn new(transport: &'a dyn HttpTransport, rate_limiter: &'a RateLimiter) -> Self {
        Self {
            transport,
            rate_limiter,
        }
    }

    /// Follows `rel="next"` links from `base_url` until the chain ends and returns every item
    /// in page order. Rate-limited requests are retried against the same URL after the reset;
    /// any other failure aborts the whole fetch.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        base_url: &str,
        per_page: u32,
    ) -> Result<Vec<T>> {
        let mut all_items = Vec::new();
        let mut next_url = Some(with_per_page(base_url, per_page));
        let mut page = 0;

        while let Some(url) = next_url {
            let response = self.transport.get(&url).await?;

            if RateLimiter::is_rate_limited(&response) {
                self.rate_limiter.wait_for_reset(&response).await;
                next_url = Some(url);
                continue;
            }

            if !response.is_success() {
                return Err(Error::Http {
                    status: response.status,
                    url,
                    body: response.body,
                });
            }

            let items: Vec<T> = serde_json::from_str(&response.body).map_err(|e| {
                Error::ParseError(format!("Unexpected page body from {}: {}", url, e))
            })?;
            page += 1;
            tracing::debug!(
                "Retrieved page {} with {} items. Total: {}",
                page,
                items.len(),
                all_items.len() + items.len()
            );
            all_items.extend(items);

            // The next link already carries per_page and the cursor
            next_url = response.header("link").and_then(parse_next_link);
        }

        Ok(all_items)
    }
}

fn with_per_page(base_url: &str, per_page: u32) -> String {
    let separator = if base_url.contains('?') { "&" } else { "?" };
    format!("{}{}per_page={}", base_url, separator, per_page)
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
