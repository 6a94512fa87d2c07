//! Read-only graph analysis
//!
//! Consumers of a finished traversal: leaf-node extraction and
//! journal-popularity ranking. Journal names come from the record's own
//! metadata when present, with the catalog's DOI-prefix table as an
//! offline fallback.

use citegraph_common::{CitationGraph, JournalCatalog};
use std::collections::HashMap;

/// One journal with the number of leaf papers attributed to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalCount {
    pub journal: String,
    pub count: usize,
}

/// Rank journals by how many of the graph's leaf nodes they published.
///
/// Leaves are the frontier of the literature the traversal reached, so
/// this approximates which journals the root's citation neighborhood
/// bottoms out in. Sorted by count descending, then name.
pub fn popular_journals(graph: &CitationGraph, catalog: &JournalCatalog) -> Vec<JournalCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for doi in graph.leaf_dois() {
        let name = graph
            .get(doi)
            .and_then(|record| record.meta.as_ref())
            .and_then(|meta| meta.journal.clone())
            .or_else(|| catalog.name_for_doi(doi).map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut ranked: Vec<JournalCount> = counts
        .into_iter()
        .map(|(journal, count)| JournalCount { journal, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.journal.cmp(&b.journal)));
    ranked
}
