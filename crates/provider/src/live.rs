//! Combined live paper source
//!
//! The two citation indexes are asymmetric: Crossref knows what a work
//! references, the COCI index knows what cites it. `LiveSource` pairs them
//! behind the single `PaperSource` seam the engine consumes.

use crate::crossref::CrossrefClient;
use crate::opencitations::OpenCitationsClient;
use citegraph_common::config::AppConfig;
use citegraph_common::{Doi, FetchResult, ForwardRecord, PaperSource, Result};
use async_trait::async_trait;

/// `PaperSource` backed by Crossref (forward) and OpenCitations (backward)
pub struct LiveSource {
    crossref: CrossrefClient,
    opencitations: OpenCitationsClient,
}

impl LiveSource {
    pub fn new(crossref: CrossrefClient, opencitations: OpenCitationsClient) -> Self {
        Self {
            crossref,
            opencitations,
        }
    }

    /// Build both clients from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            crossref: CrossrefClient::new(&config.crossref)?,
            opencitations: OpenCitationsClient::new(&config.opencitations)?,
        })
    }

    pub fn crossref(&self) -> &CrossrefClient {
        &self.crossref
    }
}

#[async_trait]
impl PaperSource for LiveSource {
    async fn fetch_forward(&self, doi: &Doi) -> FetchResult<ForwardRecord> {
        self.crossref.work(doi).await
    }

    async fn fetch_backward(&self, doi: &Doi) -> FetchResult<Vec<Doi>> {
        self.opencitations.citations(doi).await
    }

    fn name(&self) -> &str {
        "crossref+opencitations"
    }
}
