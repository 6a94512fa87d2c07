//! Bounded bidirectional citation traversal
//!
//! Expands the citation neighborhood of a root DOI out to a depth bound,
//! following both reference (forward) and citer (backward) edges, visiting
//! each identifier at most once.
//!
//! The frontier is processed level by level in depth order: every DOI
//! discovered at depth `d` is fetched before anything at `d + 1`, so a
//! record's depth is its minimum hop distance from the root. Within a
//! level, fetches run concurrently on a bounded worker pool
//! (`buffer_unordered`); the visited set is owned by the single traversal
//! loop, so test-and-set on insertion needs no lock.
//!
//! Provider failures never abort a run: the failed identifier degrades to
//! an empty record and the traversal carries on.

use citegraph_common::{AppError, CitationGraph, Doi, NodeRecord, PaperSource, Result};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Traversal parameters
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Depth bound: nodes at this depth are recorded but not expanded
    pub max_depth: u32,

    /// Concurrent fetches per frontier level
    pub workers: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: citegraph_common::DEFAULT_MAX_DEPTH,
            workers: citegraph_common::DEFAULT_WORKERS,
        }
    }
}

impl From<&citegraph_common::config::CrawlerConfig> for TraversalConfig {
    fn from(config: &citegraph_common::config::CrawlerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            workers: config.workers,
        }
    }
}

/// Summary counters for one `expand` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Identifiers fetched during this run (seeded records excluded)
    pub visited: usize,

    /// Records stored with at least one failed fetch
    pub degraded: usize,

    /// Failed forward (reference) fetches
    pub forward_failures: usize,

    /// Failed backward (citer) fetches
    pub backward_failures: usize,

    /// Records carried over from the seed graph
    pub seeded: usize,

    /// True when the run stopped on cancellation
    pub cancelled: bool,
}

/// Result of one `expand` run
#[derive(Debug)]
pub struct TraversalOutcome {
    pub graph: CitationGraph,
    pub stats: TraversalStats,
}

/// Cooperative cancellation handle.
///
/// Cancelling stops the traversal at the next frontier step; records
/// already committed stay in the graph, which remains persistable.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callbacks, purely informational
pub trait ProgressObserver: Send + Sync {
    fn on_visit(&self, _doi: &Doi, _depth: u32, _visited: usize) {}

    fn on_degraded(&self, _doi: &Doi, _depth: u32) {}

    fn on_complete(&self, _stats: &TraversalStats) {}
}

/// Default observer: structured log lines
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_visit(&self, doi: &Doi, depth: u32, visited: usize) {
        tracing::debug!(doi = %doi, depth, visited, "visited");
    }

    fn on_degraded(&self, doi: &Doi, depth: u32) {
        tracing::debug!(doi = %doi, depth, "degraded record stored");
    }

    fn on_complete(&self, stats: &TraversalStats) {
        tracing::info!(
            visited = stats.visited,
            degraded = stats.degraded,
            seeded = stats.seeded,
            cancelled = stats.cancelled,
            "traversal complete"
        );
    }
}

/// One fetched node, before it is committed to the graph
struct NodeFetch {
    record: NodeRecord,
    forward_failed: bool,
    backward_failed: bool,
}

/// The traversal engine
pub struct Traverser {
    source: Arc<dyn PaperSource>,
    config: TraversalConfig,
    observer: Arc<dyn ProgressObserver>,
}

impl Traverser {
    pub fn new(source: Arc<dyn PaperSource>, config: TraversalConfig) -> Self {
        Self {
            source,
            config,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Expand the citation neighborhood of `root` out to the configured
    /// depth bound.
    ///
    /// With a `seed` graph, its records are pre-marked visited and excluded
    /// from re-fetch; the frontier restarts from their unvisited neighbors,
    /// which is how an interrupted run resumes.
    pub async fn expand(
        &self,
        root: &Doi,
        seed: Option<CitationGraph>,
        cancel: &CancelToken,
    ) -> Result<TraversalOutcome> {
        if root.is_empty() {
            return Err(AppError::invalid_input("root DOI must not be empty"));
        }

        let max_depth = self.config.max_depth;
        let workers = self.config.workers.max(1);
        let mut stats = TraversalStats::default();
        let mut visited: HashSet<Doi> = HashSet::new();
        // Frontier, keyed by depth so levels are processed in depth order
        let mut pending: BTreeMap<u32, Vec<Doi>> = BTreeMap::new();

        let mut graph = match seed {
            Some(seeded) => {
                if seeded.root() != root {
                    return Err(AppError::invalid_input(format!(
                        "seed graph is rooted at {}, expected {}",
                        seeded.root(),
                        root
                    )));
                }
                stats.seeded = seeded.node_count();
                visited.extend(seeded.dois().cloned());

                // Restart the frontier from unvisited neighbors of the
                // seed's non-boundary records. A neighbor shared between a
                // shallow and a deep seed record must be queued at the
                // minimum parent depth + 1, so all parents are surveyed
                // before anything is committed to the frontier.
                let mut discovered: HashMap<Doi, u32> = HashMap::new();
                for record in seeded.records() {
                    if record.depth >= max_depth {
                        continue;
                    }
                    for neighbor in record.references.iter().chain(record.cited_by.iter()) {
                        if visited.contains(neighbor) {
                            continue;
                        }
                        discovered
                            .entry(neighbor.clone())
                            .and_modify(|d| *d = (*d).min(record.depth + 1))
                            .or_insert(record.depth + 1);
                    }
                }
                for (neighbor, depth) in discovered {
                    visited.insert(neighbor.clone());
                    pending.entry(depth).or_default().push(neighbor);
                }
                seeded
            }
            None => CitationGraph::new(root.clone()),
        };

        if visited.insert(root.clone()) {
            pending.entry(0).or_default().push(root.clone());
        }

        tracing::info!(
            root = %root,
            max_depth,
            workers,
            source = self.source.name(),
            seeded = stats.seeded,
            "starting traversal"
        );

        'levels: while let Some((&depth, _)) = pending.first_key_value() {
            let batch = pending.remove(&depth).unwrap_or_default();
            let at_bound = depth == max_depth;

            let source = &self.source;
            let mut fetched = stream::iter(batch)
                .map(|doi| {
                    let source = Arc::clone(source);
                    async move { Self::fetch_node(source, doi, depth, at_bound).await }
                })
                .buffer_unordered(workers);

            while let Some(fetch) = fetched.next().await {
                if cancel.is_cancelled() {
                    stats.cancelled = true;
                    break 'levels;
                }

                stats.visited += 1;
                if fetch.forward_failed {
                    stats.forward_failures += 1;
                }
                if fetch.backward_failed {
                    stats.backward_failures += 1;
                }
                if fetch.record.degraded {
                    stats.degraded += 1;
                    self.observer.on_degraded(&fetch.record.doi, depth);
                }
                self.observer.on_visit(&fetch.record.doi, depth, stats.visited);

                if !at_bound {
                    // Test-and-set at queue time: an identifier reachable
                    // through several parents is queued exactly once
                    for neighbor in fetch
                        .record
                        .references
                        .iter()
                        .chain(fetch.record.cited_by.iter())
                    {
                        if visited.insert(neighbor.clone()) {
                            pending
                                .entry(depth + 1)
                                .or_default()
                                .push(neighbor.clone());
                        }
                    }
                }

                graph.insert(fetch.record);
            }
        }

        self.observer.on_complete(&stats);
        Ok(TraversalOutcome { graph, stats })
    }

    /// Fetch one node. Forward and backward fetches are independent: a
    /// failure on one side leaves the other side's data intact, and the
    /// record is stored either way.
    ///
    /// At the depth bound only metadata is fetched; no neighbors are ever
    /// recorded on a boundary node.
    async fn fetch_node(
        source: Arc<dyn PaperSource>,
        doi: Doi,
        depth: u32,
        at_bound: bool,
    ) -> NodeFetch {
        if at_bound {
            return match source.fetch_forward(&doi).await {
                Ok(forward) => {
                    let mut record = NodeRecord::new(doi, depth);
                    record.meta = Some(forward.meta);
                    NodeFetch {
                        record,
                        forward_failed: false,
                        backward_failed: false,
                    }
                }
                Err(err) => {
                    tracing::warn!(doi = %doi, depth, error = %err, "forward fetch failed");
                    NodeFetch {
                        record: NodeRecord::degraded(doi, depth),
                        forward_failed: true,
                        backward_failed: false,
                    }
                }
            };
        }

        let (forward, backward) =
            tokio::join!(source.fetch_forward(&doi), source.fetch_backward(&doi));

        let mut record = NodeRecord::new(doi.clone(), depth);
        let mut forward_failed = false;
        let mut backward_failed = false;

        match forward {
            Ok(data) => {
                record.meta = Some(data.meta);
                record.references = data.references;
            }
            Err(err) => {
                tracing::warn!(doi = %doi, depth, error = %err, "forward fetch failed");
                forward_failed = true;
            }
        }

        match backward {
            Ok(citing) => record.cited_by = citing,
            Err(err) => {
                tracing::warn!(doi = %doi, depth, error = %err, "backward fetch failed");
                backward_failed = true;
            }
        }

        record.degraded = forward_failed || backward_failed;
        NodeFetch {
            record,
            forward_failed,
            backward_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use citegraph_common::{FetchError, FetchResult, ForwardRecord, PaperMeta};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Scripted source: forward and backward responses per DOI, with a
    /// fetch counter per identifier
    #[derive(Default)]
    struct MockSource {
        forward: HashMap<Doi, ForwardRecord>,
        backward: HashMap<Doi, Vec<Doi>>,
        fetches: Mutex<HashMap<Doi, usize>>,
        total_fetch_pairs: AtomicUsize,
    }

    impl MockSource {
        fn new() -> Self {
            Self::default()
        }

        /// Register a paper with references and citers; unregistered DOIs
        /// fail both fetches
        fn paper(mut self, doi: &str, references: &[&str], cited_by: &[&str]) -> Self {
            let doi = Doi::new(doi);
            self.forward.insert(
                doi.clone(),
                ForwardRecord {
                    meta: PaperMeta {
                        doi: doi.clone(),
                        title: format!("title of {doi}"),
                        authors: "unknown".to_string(),
                        year: Some(2020),
                        journal: None,
                    },
                    references: references.iter().map(|r| Doi::new(*r)).collect(),
                },
            );
            self.backward
                .insert(doi, cited_by.iter().map(|c| Doi::new(*c)).collect());
            self
        }

        fn fetch_count(&self, doi: &str) -> usize {
            self.fetches
                .lock()
                .unwrap()
                .get(&Doi::new(doi))
                .copied()
                .unwrap_or(0)
        }

        fn total_pairs(&self) -> usize {
            self.total_fetch_pairs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaperSource for MockSource {
        async fn fetch_forward(&self, doi: &Doi) -> FetchResult<ForwardRecord> {
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(doi.clone())
                .or_insert(0) += 1;
            self.total_fetch_pairs.fetch_add(1, Ordering::SeqCst);
            self.forward
                .get(doi)
                .cloned()
                .ok_or_else(|| FetchError::not_found(doi))
        }

        async fn fetch_backward(&self, doi: &Doi) -> FetchResult<Vec<Doi>> {
            self.backward
                .get(doi)
                .cloned()
                .ok_or_else(|| FetchError::not_found(doi))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn traverser(source: Arc<MockSource>, max_depth: u32) -> Traverser {
        Traverser::new(
            source,
            TraversalConfig {
                max_depth,
                workers: 4,
            },
        )
    }

    #[tokio::test]
    async fn test_single_hop_neighborhood() {
        // Root P0 references P1 and P2 and is cited by P3; all three fail
        // on further fetch
        let source = Arc::new(MockSource::new().paper("P0", &["P1", "P2"], &["P3"]));
        let engine = traverser(Arc::clone(&source), 1);

        let outcome = engine
            .expand(&Doi::new("P0"), None, &CancelToken::new())
            .await
            .unwrap();
        let graph = outcome.graph;

        assert_eq!(graph.node_count(), 4);

        let root = graph.get(&Doi::new("P0")).unwrap();
        assert_eq!(root.depth, 0);
        assert_eq!(root.references, vec![Doi::new("P1"), Doi::new("P2")]);
        assert_eq!(root.cited_by, vec![Doi::new("P3")]);
        assert!(!root.degraded);

        for leaf in ["P1", "P2", "P3"] {
            let record = graph.get(&Doi::new(leaf)).unwrap();
            assert_eq!(record.depth, 1);
            assert!(record.meta.is_none());
            assert_eq!(record.neighbor_count(), 0);
            assert!(record.degraded);
        }

        assert_eq!(outcome.stats.visited, 4);
        assert_eq!(outcome.stats.degraded, 3);
    }

    #[tokio::test]
    async fn test_shared_neighbor_discovered_at_minimum_depth() {
        // A references B, B references C, and C also cites A directly.
        // C must land at depth 1 (the backward hop from A) and be fetched
        // exactly once.
        let source = Arc::new(
            MockSource::new()
                .paper("A", &["B"], &["C"])
                .paper("B", &["C"], &[])
                .paper("C", &[], &[]),
        );
        let engine = traverser(Arc::clone(&source), 2);

        let outcome = engine
            .expand(&Doi::new("A"), None, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.graph.node_count(), 3);
        assert_eq!(outcome.graph.get(&Doi::new("C")).unwrap().depth, 1);
        assert_eq!(source.fetch_count("C"), 1);
    }

    #[tokio::test]
    async fn test_diamond_visits_each_identifier_once() {
        let source = Arc::new(
            MockSource::new()
                .paper("A", &["B", "C"], &[])
                .paper("B", &["D"], &[])
                .paper("C", &["D"], &[])
                .paper("D", &[], &[]),
        );
        let engine = traverser(Arc::clone(&source), 3);

        let outcome = engine
            .expand(&Doi::new("A"), None, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.graph.node_count(), 4);
        assert_eq!(outcome.graph.get(&Doi::new("D")).unwrap().depth, 2);
        for doi in ["A", "B", "C", "D"] {
            assert_eq!(source.fetch_count(doi), 1, "{doi} fetched more than once");
        }
    }

    #[tokio::test]
    async fn test_boundary_node_records_no_neighbors() {
        // B sits at the depth bound; the provider would report neighbors
        // for it, but none may be recorded
        let source = Arc::new(
            MockSource::new()
                .paper("A", &["B"], &[])
                .paper("B", &["C"], &["D"]),
        );
        let engine = traverser(Arc::clone(&source), 1);

        let outcome = engine
            .expand(&Doi::new("A"), None, &CancelToken::new())
            .await
            .unwrap();
        let graph = outcome.graph;

        let boundary = graph.get(&Doi::new("B")).unwrap();
        assert_eq!(boundary.depth, 1);
        assert_eq!(boundary.neighbor_count(), 0);
        // Metadata is still fetched for boundary nodes
        assert!(boundary.meta.is_some());
        assert!(!boundary.degraded);

        // Beyond-bound identifiers never enter the graph
        assert!(!graph.contains(&Doi::new("C")));
        assert!(!graph.contains(&Doi::new("D")));
        assert!(graph.records().all(|r| r.depth <= 1));
    }

    #[tokio::test]
    async fn test_depth_zero_records_only_the_root() {
        let source = Arc::new(MockSource::new().paper("A", &["B"], &["C"]));
        let engine = traverser(Arc::clone(&source), 0);

        let outcome = engine
            .expand(&Doi::new("A"), None, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.graph.node_count(), 1);
        let root = outcome.graph.get(&Doi::new("A")).unwrap();
        assert_eq!(root.neighbor_count(), 0);
        assert!(root.meta.is_some());
    }

    #[tokio::test]
    async fn test_degraded_node_does_not_abort_the_run() {
        // B fails both fetches; C must still be visited and expanded
        let source = Arc::new(
            MockSource::new()
                .paper("A", &["B", "C"], &[])
                .paper("C", &["D"], &[])
                .paper("D", &[], &[]),
        );
        let engine = traverser(Arc::clone(&source), 2);

        let outcome = engine
            .expand(&Doi::new("A"), None, &CancelToken::new())
            .await
            .unwrap();
        let graph = outcome.graph;

        assert!(graph.get(&Doi::new("B")).unwrap().degraded);
        assert!(graph.contains(&Doi::new("C")));
        assert!(graph.contains(&Doi::new("D")));
        assert_eq!(outcome.stats.forward_failures, 1);
    }

    #[tokio::test]
    async fn test_resume_is_idempotent() {
        let source = Arc::new(
            MockSource::new()
                .paper("A", &["B"], &["C"])
                .paper("B", &[], &[])
                .paper("C", &[], &[]),
        );
        let engine = traverser(Arc::clone(&source), 2);
        let root = Doi::new("A");

        let first = engine
            .expand(&root, None, &CancelToken::new())
            .await
            .unwrap();
        let pairs_after_first = source.total_pairs();

        let second = engine
            .expand(&root, Some(first.graph.clone()), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(second.graph, first.graph);
        assert_eq!(second.stats.visited, 0);
        assert_eq!(second.stats.seeded, first.graph.node_count());
        // No new fetches happened
        assert_eq!(source.total_pairs(), pairs_after_first);
    }

    #[tokio::test]
    async fn test_resume_fetches_only_missing_neighbors() {
        let source = Arc::new(
            MockSource::new()
                .paper("A", &["B"], &[])
                .paper("B", &[], &[]),
        );
        let engine = traverser(Arc::clone(&source), 2);
        let root = Doi::new("A");

        // Partial graph from an interrupted run: the root is committed with
        // its edges, but B was never fetched
        let mut partial = CitationGraph::new(root.clone());
        let mut record = NodeRecord::new(root.clone(), 0);
        record.references = vec![Doi::new("B")];
        partial.insert(record);

        let outcome = engine
            .expand(&root, Some(partial), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.graph.node_count(), 2);
        assert_eq!(outcome.graph.get(&Doi::new("B")).unwrap().depth, 1);
        assert_eq!(outcome.stats.visited, 1);
        assert_eq!(source.fetch_count("A"), 0);
        assert_eq!(source.fetch_count("B"), 1);
    }

    #[tokio::test]
    async fn test_resume_queues_shared_neighbor_at_minimum_depth() {
        // Interrupted run left a shallow record (depth 1) and a deep record
        // (depth 3) both referencing the unfetched N. N must resume at
        // depth 2, whichever parent the seed iteration sees first.
        let source = Arc::new(MockSource::new().paper("N", &[], &[]));
        let engine = traverser(Arc::clone(&source), 5);
        let root = Doi::new("R");

        let mut partial = CitationGraph::new(root.clone());
        let mut rec_root = NodeRecord::new(root.clone(), 0);
        rec_root.references = vec![Doi::new("A1")];
        partial.insert(rec_root);
        let mut shallow = NodeRecord::new(Doi::new("B2"), 1);
        shallow.references = vec![Doi::new("N")];
        partial.insert(shallow);
        let mut deep = NodeRecord::new(Doi::new("A1"), 3);
        deep.references = vec![Doi::new("N")];
        partial.insert(deep);

        let outcome = engine
            .expand(&root, Some(partial), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.graph.get(&Doi::new("N")).unwrap().depth, 2);
        assert_eq!(source.fetch_count("N"), 1);
    }

    #[tokio::test]
    async fn test_empty_root_is_rejected() {
        let source = Arc::new(MockSource::new());
        let engine = traverser(source, 1);

        let result = engine
            .expand(&Doi::new(""), None, &CancelToken::new())
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_seed_with_wrong_root_is_rejected() {
        let source = Arc::new(MockSource::new().paper("A", &[], &[]));
        let engine = traverser(source, 1);

        let seed = CitationGraph::new(Doi::new("OTHER"));
        let result = engine
            .expand(&Doi::new("A"), Some(seed), &CancelToken::new())
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_stops_expansion() {
        let source = Arc::new(
            MockSource::new()
                .paper("A", &["B"], &[])
                .paper("B", &["C"], &[])
                .paper("C", &[], &[]),
        );
        let engine = traverser(Arc::clone(&source), 3);

        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = engine
            .expand(&Doi::new("A"), None, &cancel)
            .await
            .unwrap();

        assert!(outcome.stats.cancelled);
        // Nothing committed after the cancellation point; whatever is in
        // the graph is complete records only
        assert!(outcome.graph.node_count() <= 1);
        for record in outcome.graph.records() {
            assert!(record.depth <= 3);
        }
    }
}
