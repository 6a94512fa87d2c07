//! Canonical citation-graph data model
//!
//! The flat, deduplicated model: one [`NodeRecord`] per visited [`Doi`],
//! keyed in a single map inside [`CitationGraph`]. Edge sets are stored
//! redundantly from both endpoints (a record lists the papers it references
//! and the papers citing it); [`CitationGraph::edge_set`] merges the two
//! perspectives without double-counting.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// A normalized scholarly-work identifier (DOI-like string).
///
/// Equality is exact string equality; the core performs no case or
/// whitespace normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Doi(String);

impl Doi {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Registrant prefix: everything before the first `/`.
    ///
    /// DOIs minted by one publisher share this prefix, which is what the
    /// journal catalog keys shard lookups on.
    pub fn prefix(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// Filesystem-safe form of the DOI (`/` flattened to `_`), used by the
    /// output filename convention.
    pub fn file_stem(&self) -> String {
        self.0.replace('/', "_")
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Doi {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for Doi {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Bibliographic metadata for one paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMeta {
    pub doi: Doi,

    pub title: String,

    /// Comma-joined author names, as the upstream API reports them
    pub authors: String,

    /// Publication year, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Container title (journal name), when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
}

/// Per-identifier traversal cache entry
///
/// Created exactly once per traversal run. `references` and `cited_by` are
/// populated atomically from a single provider response pair and never
/// partially overwritten by a later visit to the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub doi: Doi,

    /// Absent when the forward provider lookup failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaperMeta>,

    /// DOIs this work references (forward edges), provider order preserved
    #[serde(default)]
    pub references: Vec<Doi>,

    /// DOIs of works citing this one (backward edges), provider order preserved
    #[serde(default)]
    pub cited_by: Vec<Doi>,

    /// Hop distance from the root at which this node was first discovered
    pub depth: u32,

    /// True when at least one provider fetch for this node failed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl NodeRecord {
    /// Fully-populated record from a successful fetch pair
    pub fn new(doi: Doi, depth: u32) -> Self {
        Self {
            doi,
            meta: None,
            references: Vec::new(),
            cited_by: Vec::new(),
            depth,
            degraded: false,
        }
    }

    /// Record for an identifier whose provider lookups failed: empty edge
    /// lists, unknown metadata. Stored rather than dropped so the traversal
    /// keeps a complete account of what it reached.
    pub fn degraded(doi: Doi, depth: u32) -> Self {
        Self {
            doi,
            meta: None,
            references: Vec::new(),
            cited_by: Vec::new(),
            depth,
            degraded: true,
        }
    }

    /// Neighbor count recorded on this node (both directions)
    pub fn neighbor_count(&self) -> usize {
        self.references.len() + self.cited_by.len()
    }
}

/// The traversal result: a flat map from DOI to [`NodeRecord`], plus the
/// root the traversal started from.
///
/// Growth is monotonic within a run: records are inserted at most once and
/// never deleted. The map is ordered so persisted output is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationGraph {
    root: Doi,
    nodes: BTreeMap<Doi, NodeRecord>,
}

impl CitationGraph {
    /// Create an empty graph rooted at `root`
    pub fn new(root: Doi) -> Self {
        Self {
            root,
            nodes: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Doi {
        &self.root
    }

    /// Insert a record. The first record for a DOI wins; a duplicate insert
    /// is ignored, preserving the at-most-once invariant.
    pub fn insert(&mut self, record: NodeRecord) {
        self.nodes.entry(record.doi.clone()).or_insert(record);
    }

    pub fn contains(&self, doi: &Doi) -> bool {
        self.nodes.contains_key(doi)
    }

    pub fn get(&self, doi: &Doi) -> Option<&NodeRecord> {
        self.nodes.get(doi)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all records in DOI order
    pub fn records(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Iterate over all visited DOIs in order
    pub fn dois(&self) -> impl Iterator<Item = &Doi> {
        self.nodes.keys()
    }

    /// Directed edge set as `(citing, cited)` pairs.
    ///
    /// An edge may be recorded from either endpoint (`A.references` contains
    /// `B`, or `B.cited_by` contains `A`); merging through a set keeps each
    /// edge exactly once even when both endpoints recorded it.
    pub fn edge_set(&self) -> HashSet<(Doi, Doi)> {
        let mut edges = HashSet::new();
        for record in self.nodes.values() {
            for cited in &record.references {
                edges.insert((record.doi.clone(), cited.clone()));
            }
            for citing in &record.cited_by {
                edges.insert((citing.clone(), record.doi.clone()));
            }
        }
        edges
    }

    /// DOIs with no recorded outgoing references (traversal leaves in the
    /// forward direction)
    pub fn leaf_dois(&self) -> Vec<&Doi> {
        self.nodes
            .values()
            .filter(|r| r.references.is_empty())
            .map(|r| &r.doi)
            .collect()
    }

    /// Count of degraded records
    pub fn degraded_count(&self) -> usize {
        self.nodes.values().filter(|r| r.degraded).count()
    }

    /// Maximum recorded depth, or 0 for an empty graph
    pub fn max_depth(&self) -> u32 {
        self.nodes.values().map(|r| r.depth).max().unwrap_or(0)
    }
}
