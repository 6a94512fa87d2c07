//! OpenCitations COCI index adapter
//!
//! Backward lookup: `GET /citations/{doi}` yields the DOIs of works citing
//! the given one. The index answers with an empty array for DOIs it does
//! not know, so an empty result is a valid (not degraded) outcome.

use citegraph_common::config::OpenCitationsConfig;
use citegraph_common::{Doi, FetchError, FetchResult, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

/// OpenCitations COCI client
pub struct OpenCitationsClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    limiter: DefaultDirectRateLimiter,
}

#[derive(Deserialize)]
struct CitationEntry {
    #[serde(default)]
    citing: Option<String>,
}

impl OpenCitationsClient {
    /// Create a new client from configuration
    pub fn new(config: &OpenCitationsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("citegraph/{}", citegraph_common::VERSION))
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    /// Fetch the DOIs of works citing `doi`
    pub async fn citations(&self, doi: &Doi) -> FetchResult<Vec<Doi>> {
        let url = format!("{}/citations/{}", self.base_url, crate::crossref::encode_doi(doi));
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            self.limiter.until_ready().await;

            match self.citations_once(&url).await {
                Ok(citing) => return Ok(citing),
                Err(message) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        doi = %doi,
                        error = %message,
                        "OpenCitations request failed, retrying"
                    );
                    last_error = message;
                }
            }
        }

        Err(FetchError::unavailable(doi, last_error))
    }

    async fn citations_once(&self, url: &str) -> std::result::Result<Vec<Doi>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("API error {}", response.status()));
        }

        let entries: Vec<CitationEntry> = response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.citing.map(Doi::new))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_citation_entries() {
        let json = r#"[
            {"citing": "10.1/a", "cited": "10.1/x"},
            {"cited": "10.1/x"},
            {"citing": "10.1/b"}
        ]"#;
        let entries: Vec<CitationEntry> = serde_json::from_str(json).unwrap();
        let citing: Vec<Doi> = entries
            .into_iter()
            .filter_map(|e| e.citing.map(Doi::new))
            .collect();
        assert_eq!(citing, vec![Doi::new("10.1/a"), Doi::new("10.1/b")]);
    }
}
