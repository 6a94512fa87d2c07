//! Local journal-shard paper source
//!
//! An offline substitute for the live providers: a directory of
//! `{issn}_{year}.json` files, each mapping DOI to `{info, references}` for
//! one journal-year. The whole dataset is loaded at open time and a reverse
//! citation index is derived from the reference lists, so backward lookup
//! works offline too.
//!
//! Lookups for identifiers no shard covers fail with `NotFound` rather
//! than raising; the engine degrades those nodes and carries on.

use citegraph_common::{
    AppError, Doi, FetchError, FetchResult, ForwardRecord, JournalCatalog, PaperMeta, PaperSource,
    Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One paper as stored in a shard file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShardPaper {
    #[serde(default)]
    pub info: ShardInfo,

    #[serde(default)]
    pub references: Vec<String>,
}

/// Metadata block inside a shard record.
///
/// Tolerant of the dataset's historical quirks: any field may be missing,
/// and `year` may be a number or the literal string `"unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShardInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

impl ShardInfo {
    fn year_i32(&self) -> Option<i32> {
        self.year
            .as_ref()
            .and_then(|v| v.as_i64())
            .and_then(|y| i32::try_from(y).ok())
    }
}

/// In-memory view of the shard dataset
pub struct ShardStore {
    records: HashMap<Doi, ShardPaper>,
    /// cited DOI -> citing DOIs, derived from the shard reference lists
    reverse: HashMap<Doi, Vec<Doi>>,
    /// publication year from the shard filename, per DOI
    years: HashMap<Doi, i32>,
    /// journal name resolved from the shard filename's ISSN, per DOI
    journals: HashMap<Doi, String>,
    shard_count: usize,
}

impl ShardStore {
    /// Load every `{issn}_{year}.json` shard under `dir`.
    ///
    /// A file that does not parse fails the whole open; the dataset is
    /// read-only afterwards.
    pub fn open(dir: impl AsRef<Path>, catalog: &JournalCatalog) -> Result<Self> {
        let dir = dir.as_ref();
        let mut store = Self {
            records: HashMap::new(),
            reverse: HashMap::new(),
            years: HashMap::new(),
            journals: HashMap::new(),
            shard_count: 0,
        };

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some((issn, year)) = parse_shard_name(&path) else {
                tracing::debug!(path = %path.display(), "skipping non-shard file");
                continue;
            };

            let data = std::fs::read_to_string(&path)?;
            let shard: HashMap<String, ShardPaper> =
                serde_json::from_str(&data).map_err(|e| {
                    AppError::corrupt_data(path.display().to_string(), e.to_string())
                })?;

            let journal = catalog.journal_name(&issn).map(|n| n.to_string());
            store.absorb_shard(shard, year, journal);
            store.shard_count += 1;
        }

        tracing::info!(
            shards = store.shard_count,
            papers = store.records.len(),
            dir = %dir.display(),
            "loaded shard dataset"
        );

        Ok(store)
    }

    fn absorb_shard(
        &mut self,
        shard: HashMap<String, ShardPaper>,
        year: i32,
        journal: Option<String>,
    ) {
        for (raw_doi, paper) in shard {
            let doi = Doi::new(raw_doi);
            // First shard mentioning a DOI wins; later duplicates (the same
            // journal under a second ISSN) would double the reverse edges
            if self.records.contains_key(&doi) {
                continue;
            }

            for reference in &paper.references {
                let citers = self.reverse.entry(Doi::new(reference.clone())).or_default();
                // A paper listing the same reference twice must still count
                // as a single citer
                if !citers.contains(&doi) {
                    citers.push(doi.clone());
                }
            }

            self.years.insert(doi.clone(), year);
            if let Some(name) = &journal {
                self.journals.insert(doi.clone(), name.clone());
            }
            self.records.insert(doi, paper);
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    pub fn paper_count(&self) -> usize {
        self.records.len()
    }
}

/// Extract `(issn, year)` from a `{issn}_{year}.json` filename
fn parse_shard_name(path: &Path) -> Option<(String, i32)> {
    let stem = path.file_stem()?.to_str()?;
    let (issn, year) = stem.rsplit_once('_')?;
    let year: i32 = year.parse().ok()?;
    Some((issn.to_string(), year))
}

#[async_trait]
impl PaperSource for ShardStore {
    async fn fetch_forward(&self, doi: &Doi) -> FetchResult<ForwardRecord> {
        let paper = self
            .records
            .get(doi)
            .ok_or_else(|| FetchError::not_found(doi))?;

        let meta = PaperMeta {
            doi: doi.clone(),
            title: paper
                .info
                .title
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            authors: paper
                .info
                .authors
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            year: paper
                .info
                .year_i32()
                .or_else(|| self.years.get(doi).copied()),
            journal: self.journals.get(doi).cloned(),
        };

        Ok(ForwardRecord {
            meta,
            references: paper
                .references
                .iter()
                .map(|r| Doi::new(r.clone()))
                .collect(),
        })
    }

    async fn fetch_backward(&self, doi: &Doi) -> FetchResult<Vec<Doi>> {
        if let Some(citing) = self.reverse.get(doi) {
            return Ok(citing.clone());
        }
        if self.records.contains_key(doi) {
            // Known paper, nothing in the dataset cites it
            return Ok(Vec::new());
        }
        Err(FetchError::not_found(doi))
    }

    fn name(&self) -> &str {
        "local-shards"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_shard(dir: &Path, name: &str, body: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    const SHARD: &str = r#"{
        "10.1021/acsnano.0c01234": {
            "info": {"title": "Nano things", "authors": "A Author", "year": 2020, "doi": "10.1021/acsnano.0c01234"},
            "references": ["10.1038/nature1", "10.1103/prl1"]
        },
        "10.1021/acsnano.0c05678": {
            "info": {"title": "More nano", "authors": "unknown", "year": "unknown"},
            "references": ["10.1038/nature1"]
        }
    }"#;

    #[tokio::test]
    async fn test_forward_lookup() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "1936-0851_2020.json", SHARD);

        let catalog = JournalCatalog::builtin();
        let store = ShardStore::open(dir.path(), &catalog).unwrap();
        assert_eq!(store.shard_count(), 1);
        assert_eq!(store.paper_count(), 2);

        let doi = Doi::new("10.1021/acsnano.0c01234");
        let forward = store.fetch_forward(&doi).await.unwrap();
        assert_eq!(forward.meta.title, "Nano things");
        assert_eq!(forward.meta.year, Some(2020));
        assert_eq!(forward.meta.journal.as_deref(), Some("ACS Nano"));
        assert_eq!(forward.references.len(), 2);
    }

    #[tokio::test]
    async fn test_year_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "1936-0851_2020.json", SHARD);

        let catalog = JournalCatalog::builtin();
        let store = ShardStore::open(dir.path(), &catalog).unwrap();

        // "year": "unknown" in the info block, so the filename year applies
        let doi = Doi::new("10.1021/acsnano.0c05678");
        let forward = store.fetch_forward(&doi).await.unwrap();
        assert_eq!(forward.meta.year, Some(2020));
    }

    #[tokio::test]
    async fn test_reverse_index() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "1936-0851_2020.json", SHARD);

        let catalog = JournalCatalog::builtin();
        let store = ShardStore::open(dir.path(), &catalog).unwrap();

        let cited = Doi::new("10.1038/nature1");
        let mut citing = store.fetch_backward(&cited).await.unwrap();
        citing.sort();
        assert_eq!(
            citing,
            vec![
                Doi::new("10.1021/acsnano.0c01234"),
                Doi::new("10.1021/acsnano.0c05678")
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_reference_yields_one_citer() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(
            dir.path(),
            "1936-0851_2020.json",
            r#"{
                "10.1021/acsnano.0c01234": {
                    "info": {"title": "Nano things"},
                    "references": ["10.1038/nature1", "10.1038/nature1"]
                }
            }"#,
        );

        let catalog = JournalCatalog::builtin();
        let store = ShardStore::open(dir.path(), &catalog).unwrap();

        let citing = store
            .fetch_backward(&Doi::new("10.1038/nature1"))
            .await
            .unwrap();
        assert_eq!(citing, vec![Doi::new("10.1021/acsnano.0c01234")]);
    }

    #[tokio::test]
    async fn test_unknown_doi_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "1936-0851_2020.json", SHARD);

        let catalog = JournalCatalog::builtin();
        let store = ShardStore::open(dir.path(), &catalog).unwrap();

        let stranger = Doi::new("10.9999/absent");
        assert!(matches!(
            store.fetch_forward(&stranger).await,
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            store.fetch_backward(&stranger).await,
            Err(FetchError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_shard_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "1936-0851_2020.json", "{ not json");

        let catalog = JournalCatalog::builtin();
        let result = ShardStore::open(dir.path(), &catalog);
        assert!(matches!(result, Err(AppError::CorruptData { .. })));
    }
}
