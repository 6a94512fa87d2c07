//! CiteGraph paper-source adapters
//!
//! Concrete implementations of the `PaperSource` seam:
//! - [`CrossrefClient`]: forward lookup (metadata + references) against the
//!   Crossref REST API, plus journal-works harvesting and journal search
//! - [`OpenCitationsClient`]: backward lookup (citing DOIs) against the
//!   OpenCitations COCI index
//! - [`LiveSource`]: the two live clients combined into one `PaperSource`
//! - [`ShardStore`]: offline `PaperSource` over local `{issn}_{year}.json`
//!   shard files, with a reverse citation index built at load time

pub mod crossref;
pub mod harvest;
pub mod live;
pub mod opencitations;
pub mod shards;

pub use crossref::{CrossrefClient, JournalHit};
pub use harvest::Harvester;
pub use live::LiveSource;
pub use opencitations::OpenCitationsClient;
pub use shards::ShardStore;
