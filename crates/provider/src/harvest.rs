//! Journal shard harvester
//!
//! Builds the local shard dataset by paging through Crossref journal-works
//! listings: one `{issn}_{year}.json` file per journal-year, mapping DOI to
//! `{info, references}` in the shape [`crate::shards::ShardStore`] loads.

use crate::crossref::{CrossrefClient, CrossrefWork};
use crate::shards::{ShardInfo, ShardPaper};
use citegraph_common::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Writes shard files from live Crossref listings
pub struct Harvester<'a> {
    client: &'a CrossrefClient,
    out_dir: PathBuf,
}

impl<'a> Harvester<'a> {
    pub fn new(client: &'a CrossrefClient, out_dir: impl AsRef<Path>) -> Self {
        Self {
            client,
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    /// Harvest one journal across a year range, one shard file per year.
    /// Returns the paths written.
    pub async fn harvest_journal(
        &self,
        issn: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.out_dir)?;
        let mut written = Vec::new();

        for year in start_year..=end_year {
            tracing::info!(issn, year, "harvesting journal works");
            let works = self.client.journal_works(issn, year).await?;
            let shard = build_shard(works);

            let path = self.out_dir.join(format!("{issn}_{year}.json"));
            let file = std::fs::File::create(&path)?;
            serde_json::to_writer_pretty(file, &shard)?;

            tracing::info!(
                issn,
                year,
                papers = shard.len(),
                path = %path.display(),
                "wrote shard file"
            );
            written.push(path);
        }

        Ok(written)
    }
}

/// Convert a listing page into the shard file layout
fn build_shard(works: Vec<CrossrefWork>) -> HashMap<String, ShardPaper> {
    let mut shard = HashMap::new();

    for work in works {
        // Listings occasionally contain entries without a DOI; nothing can
        // key them, so they are dropped
        let Some(doi) = work.doi() else {
            continue;
        };
        let forward = work.into_forward(&doi);

        let paper = ShardPaper {
            info: ShardInfo {
                title: Some(forward.meta.title),
                authors: Some(forward.meta.authors),
                year: forward.meta.year.map(serde_json::Value::from),
                doi: Some(doi.as_str().to_string()),
            },
            references: forward
                .references
                .into_iter()
                .map(|d| d.as_str().to_string())
                .collect(),
        };

        shard.insert(doi.as_str().to_string(), paper);
    }

    shard
}
