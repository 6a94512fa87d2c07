//! Graph persistence
//!
//! The canonical on-disk layout is the flat map: `{root, nodes}` exactly as
//! [`CitationGraph`] serializes. Loads are all-or-nothing; a stream that
//! does not parse into the expected shape fails with `CorruptData` and no
//! partial graph escapes.
//!
//! The older nested-tree layout (a recursive DOI -> children mapping rooted
//! at one start DOI) is supported on load for compatibility, and as an
//! export view. The tree view is lossy: citer edges and metadata are
//! dropped, and a node reachable through two parents is duplicated under
//! each, one subtree per citation path. Import collapses that duplication
//! back into the flat model.

use citegraph_common::{AppError, CitationGraph, Doi, NodeRecord, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Output filename convention: `reference_graph_{root}.json` with path
/// separators flattened. Informational only; load never depends on it.
pub fn graph_filename(root: &Doi) -> String {
    format!("reference_graph_{}.json", root.file_stem())
}

/// Serialize a graph to a writer (flat-map layout)
pub fn save(graph: &CitationGraph, writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(writer, graph)?;
    Ok(())
}

/// Save a graph under `dir` using the filename convention; returns the path
pub fn save_to_dir(graph: &CitationGraph, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(graph_filename(graph.root()));
    let file = std::fs::File::create(&path)?;
    save(graph, file)?;
    tracing::info!(path = %path.display(), nodes = graph.node_count(), "saved graph");
    Ok(path)
}

/// Load a graph from a reader, accepting either layout.
///
/// `label` names the source in errors (a path, usually).
pub fn load(reader: impl Read, label: &str) -> Result<CitationGraph> {
    let value: serde_json::Value = serde_json::from_reader(reader)
        .map_err(|e| AppError::corrupt_data(label, e.to_string()))?;

    if value.get("root").is_some() && value.get("nodes").is_some() {
        return serde_json::from_value(value)
            .map_err(|e| AppError::corrupt_data(label, e.to_string()));
    }

    // Fall back to the nested-tree layout
    let tree: TreeNode = serde_json::from_value(value)
        .map_err(|e| AppError::corrupt_data(label, e.to_string()))?;
    tree_to_graph(&tree).map_err(|e| match e {
        AppError::InvalidInput { message } => AppError::corrupt_data(label, message),
        other => other,
    })
}

/// Load a graph from a file, accepting either layout
pub fn load_file(path: impl AsRef<Path>) -> Result<CitationGraph> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    load(file, &path.display().to_string())
}

/// A node of the nested-tree layout: DOI -> child subtree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeNode(pub BTreeMap<String, TreeNode>);

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.0.is_empty()
    }
}

/// Export a graph as a nested tree rooted at the graph's root, following
/// reference edges only.
///
/// A node reachable through several parents appears under each of them
/// (one subtree per citation path); a cycle is cut at the edge that would
/// re-enter the current path.
pub fn export_tree(graph: &CitationGraph) -> TreeNode {
    let root = graph.root().clone();
    let mut path = HashSet::new();
    path.insert(root.clone());

    let mut top = BTreeMap::new();
    top.insert(root.as_str().to_string(), subtree(graph, &root, &mut path));
    TreeNode(top)
}

fn subtree(graph: &CitationGraph, doi: &Doi, path: &mut HashSet<Doi>) -> TreeNode {
    let mut children = BTreeMap::new();
    if let Some(record) = graph.get(doi) {
        for child in &record.references {
            if !path.insert(child.clone()) {
                continue;
            }
            children.insert(child.as_str().to_string(), subtree(graph, child, path));
            path.remove(child);
        }
    }
    TreeNode(children)
}

/// Export a graph's tree view to a file
pub fn export_tree_to_file(graph: &CitationGraph, path: impl AsRef<Path>) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &export_tree(graph))?;
    Ok(())
}

/// Collapse a nested tree into the flat model.
///
/// Each DOI becomes one record; the duplicated subtrees of a shared child
/// are merged, with its reference list being the union of its children
/// everywhere it appears. Depth is the minimum hop distance from the root
/// along tree edges. Metadata and citer edges are not representable in
/// this layout, so records come back bare.
pub fn tree_to_graph(tree: &TreeNode) -> Result<CitationGraph> {
    if tree.0.len() != 1 {
        return Err(AppError::invalid_input(format!(
            "nested-tree layout must have exactly one root, found {}",
            tree.0.len()
        )));
    }
    let (root_key, root_children) = tree
        .0
        .iter()
        .next()
        .map(|(k, v)| (k.clone(), v))
        .ok_or_else(|| AppError::invalid_input("nested-tree layout is empty"))?;

    let root = Doi::new(root_key);
    let mut graph = CitationGraph::new(root.clone());
    let mut depths: BTreeMap<Doi, u32> = BTreeMap::new();
    let mut references: BTreeMap<Doi, Vec<Doi>> = BTreeMap::new();

    let mut queue: VecDeque<(Doi, &TreeNode, u32)> = VecDeque::new();
    queue.push_back((root, root_children, 0));

    while let Some((doi, node, depth)) = queue.pop_front() {
        depths.entry(doi.clone()).or_insert(depth);

        let refs = references.entry(doi).or_default();
        for (child_key, child_node) in &node.0 {
            let child = Doi::new(child_key.clone());
            if !refs.contains(&child) {
                refs.push(child.clone());
            }
            queue.push_back((child, child_node, depth + 1));
        }
    }

    for (doi, refs) in references {
        let mut record = NodeRecord::new(doi.clone(), depths.get(&doi).copied().unwrap_or(0));
        record.references = refs;
        graph.insert(record);
    }

    Ok(graph)
}
