//! CiteGraph traversal engine
//!
//! The graph-construction core:
//! - [`Traverser`]: bounded, bidirectional, deduplicating frontier
//!   expansion over any `PaperSource`
//! - [`store`]: flat-map persistence (canonical), nested-tree import and
//!   export (lossy view), and resume seeding
//! - [`analysis`]: read-only consumers of a finished graph (leaf nodes,
//!   popular journals)

pub mod analysis;
pub mod store;
pub mod traversal;

pub use analysis::{popular_journals, JournalCount};
pub use store::TreeNode;
pub use traversal::{
    CancelToken, LogObserver, ProgressObserver, TraversalConfig, TraversalOutcome, TraversalStats,
    Traverser,
};
