//! Crossref REST API adapter
//!
//! Forward lookup: `GET /works/{doi}` yields a work's bibliographic
//! metadata and the DOIs it references. Also provides the journal-works
//! listing (cursor-paged) used by the shard harvester, and journal search
//! by name.

use citegraph_common::config::CrossrefConfig;
use citegraph_common::{AppError, Doi, FetchError, FetchResult, ForwardRecord, PaperMeta, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

/// Characters that must not pass through a URL path unescaped. `/` stays
/// literal: both APIs take the DOI as a multi-segment path suffix.
const DOI_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a DOI for use as a URL path suffix
pub(crate) fn encode_doi(doi: &Doi) -> String {
    utf8_percent_encode(doi.as_str(), DOI_SEGMENT).to_string()
}

/// Crossref API client
pub struct CrossrefClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    page_rows: u32,
    limiter: DefaultDirectRateLimiter,
}

/// Outcome of a single HTTP attempt, before retry policy is applied
enum RequestError {
    /// 404 from the API; never retried
    NotFound,
    /// Transport error, non-success status, or unparseable body
    Retryable(String),
}

impl CrossrefClient {
    /// Create a new client from configuration
    pub fn new(config: &CrossrefConfig) -> Result<Self> {
        let user_agent = match &config.mailto {
            // Crossref routes requests with a mailto into its polite pool
            Some(mailto) => format!(
                "citegraph/{} (mailto:{})",
                citegraph_common::VERSION,
                mailto
            ),
            None => format!("citegraph/{}", citegraph_common::VERSION),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            page_rows: config.page_rows,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    /// Fetch one work's metadata and reference list
    pub async fn work(&self, doi: &Doi) -> FetchResult<ForwardRecord> {
        let url = format!("{}/works/{}", self.base_url, encode_doi(doi));
        let response: WorksResponse = self
            .get_json(&url, &[], doi.as_str())
            .await
            .map_err(|e| match e {
                RequestError::NotFound => FetchError::not_found(doi),
                RequestError::Retryable(message) => FetchError::unavailable(doi, message),
            })?;
        Ok(response.message.into_forward(doi))
    }

    /// List a journal's works for one publication year, following cursor
    /// pagination until the listing is exhausted
    pub async fn journal_works(&self, issn: &str, year: i32) -> Result<Vec<CrossrefWork>> {
        let url = format!("{}/journals/{}/works", self.base_url, issn);
        let filter = format!(
            "from-pub-date:{year}-01-01,until-pub-date:{year}-12-31"
        );

        let mut works = Vec::new();
        let mut cursor = "*".to_string();

        loop {
            let query = [
                ("filter", filter.clone()),
                ("rows", self.page_rows.to_string()),
                ("cursor", cursor.clone()),
            ];
            let response: ListResponse<CrossrefWork> = self
                .get_json(&url, &query, issn)
                .await
                .map_err(|e| Self::listing_error(e, issn))?;

            let page = response.message.items;
            if page.is_empty() {
                break;
            }
            tracing::debug!(issn, year, count = page.len(), "retrieved journal works page");
            works.extend(page);

            match response.message.next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(works)
    }

    /// Search journals by name, returning title and ISSNs per hit
    pub async fn search_journals(&self, name: &str, rows: u32) -> Result<Vec<JournalHit>> {
        let url = format!("{}/journals", self.base_url);
        let query = [("query", name.to_string()), ("rows", rows.to_string())];
        let response: ListResponse<JournalRecord> = self
            .get_json(&url, &query, name)
            .await
            .map_err(|e| Self::listing_error(e, name))?;

        Ok(response
            .message
            .items
            .into_iter()
            .map(|record| JournalHit {
                title: record.title.unwrap_or_else(|| "unknown".to_string()),
                issns: record.issn,
            })
            .collect())
    }

    fn listing_error(err: RequestError, target: &str) -> AppError {
        match err {
            RequestError::NotFound => AppError::invalid_input(format!("unknown target: {target}")),
            RequestError::Retryable(message) => AppError::Internal {
                message: format!("Crossref request for {target} failed: {message}"),
            },
        }
    }

    /// GET with rate limiting and exponential-backoff retry. 404 responses
    /// are returned immediately; everything else is retried up to
    /// `max_retries` times.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        target: &str,
    ) -> std::result::Result<T, RequestError> {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            self.limiter.until_ready().await;

            match self.get_json_once(url, query).await {
                Ok(value) => return Ok(value),
                Err(RequestError::NotFound) => return Err(RequestError::NotFound),
                Err(RequestError::Retryable(message)) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        subject = target,
                        error = %message,
                        "Crossref request failed, retrying"
                    );
                    last_error = message;
                }
            }
        }

        Err(RequestError::Retryable(last_error))
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, RequestError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| RequestError::Retryable(format!("request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RequestError::NotFound);
        }
        if !response.status().is_success() {
            return Err(RequestError::Retryable(format!(
                "API error {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RequestError::Retryable(format!("failed to parse response: {e}")))
    }
}

/// Journal search hit
#[derive(Debug, Clone)]
pub struct JournalHit {
    pub title: String,
    pub issns: Vec<String>,
}

// ---- Crossref payload shapes ----

#[derive(Deserialize)]
struct WorksResponse {
    message: CrossrefWork,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    message: ListMessage<T>,
}

#[derive(Deserialize)]
struct ListMessage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "next-cursor", default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct JournalRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "ISSN", default)]
    issn: Vec<String>,
}

/// One work as returned by the Crossref API
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CrossrefWork {
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,

    #[serde(default)]
    pub title: Vec<String>,

    #[serde(default)]
    pub author: Vec<CrossrefAuthor>,

    #[serde(rename = "published-print", default)]
    pub published_print: Option<CrossrefDate>,

    #[serde(rename = "published-online", default)]
    pub published_online: Option<CrossrefDate>,

    #[serde(rename = "container-title", default)]
    pub container_title: Vec<String>,

    #[serde(default)]
    pub reference: Vec<CrossrefReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossrefAuthor {
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i32>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossrefReference {
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
}

impl CrossrefDate {
    fn year(&self) -> Option<i32> {
        self.date_parts.first().and_then(|parts| parts.first()).copied().flatten()
    }
}

impl CrossrefWork {
    /// Convert the raw payload into the canonical forward record.
    /// Missing fields degrade to `"unknown"` rather than failing the fetch.
    pub fn into_forward(self, doi: &Doi) -> ForwardRecord {
        let title = self
            .title
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        let authors = if self.author.is_empty() {
            "unknown".to_string()
        } else {
            self.author
                .iter()
                .map(|a| {
                    format!(
                        "{} {}",
                        a.given.as_deref().unwrap_or("unknown"),
                        a.family.as_deref().unwrap_or("unknown")
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let year = self
            .published_print
            .as_ref()
            .and_then(CrossrefDate::year)
            .or_else(|| self.published_online.as_ref().and_then(CrossrefDate::year));

        let journal = self.container_title.first().cloned();

        let references = self
            .reference
            .into_iter()
            .filter_map(|r| r.doi.map(Doi::new))
            .collect();

        ForwardRecord {
            meta: PaperMeta {
                doi: doi.clone(),
                title,
                authors,
                year,
                journal,
            },
            references,
        }
    }

    /// The work's own DOI, when the payload carries one
    pub fn doi(&self) -> Option<Doi> {
        self.doi.as_deref().map(Doi::new)
    }
}
