//! Journal catalog: ISSN lookup tables
//!
//! Immutable configuration data mapping ISSNs to journal names and to the
//! DOI registrant prefixes their papers carry. Constructed once and
//! injected into the adapters that need it; never process-wide mutable
//! state.

use crate::errors::{AppError, Result};
use crate::model::Doi;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One catalog entry, as stored in the override file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Journal display name
    pub name: String,

    /// DOI registrant prefix shared by the journal's papers, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Immutable ISSN lookup tables
#[derive(Debug, Clone, Default)]
pub struct JournalCatalog {
    entries: HashMap<String, JournalEntry>,
}

impl JournalCatalog {
    /// Catalog with the built-in journal set
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        for (issn, name, prefix) in BUILTIN_JOURNALS {
            entries.insert(
                issn.to_string(),
                JournalEntry {
                    name: name.to_string(),
                    prefix: Some(prefix.to_string()),
                },
            );
        }
        Self { entries }
    }

    /// Load a catalog from a JSON file mapping ISSN to [`JournalEntry`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let entries: HashMap<String, JournalEntry> =
            serde_json::from_str(&data).map_err(|e| {
                AppError::corrupt_data(path.display().to_string(), e.to_string())
            })?;
        Ok(Self { entries })
    }

    /// Journal name for an ISSN
    pub fn journal_name(&self, issn: &str) -> Option<&str> {
        self.entries.get(issn).map(|e| e.name.as_str())
    }

    /// DOI prefix for an ISSN
    pub fn prefix(&self, issn: &str) -> Option<&str> {
        self.entries.get(issn).and_then(|e| e.prefix.as_deref())
    }

    /// Journal name guessed from a DOI's registrant prefix.
    ///
    /// Prefixes are shared across a publisher's journals, so this is a
    /// fallback for records with no metadata; prefer the metadata's
    /// container title when present.
    pub fn name_for_doi(&self, doi: &Doi) -> Option<&str> {
        let prefix = doi.prefix();
        self.entries
            .values()
            .find(|e| e.prefix.as_deref() == Some(prefix))
            .map(|e| e.name.as_str())
    }

    /// All known ISSNs
    pub fn issns(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Built-in (ISSN, journal name, DOI prefix) table
const BUILTIN_JOURNALS: &[(&str, &str, &str)] = &[
    ("1936-0851", "ACS Nano", "10.1021"),
    ("1936-086X", "ACS Nano", "10.1021"),
    ("2574-0970", "ACS Applied Nano Materials", "10.1021"),
    ("2399-3650", "Communications Physics", "10.1038"),
    ("0036-8075", "Science", "10.1126"),
    ("1095-9203", "Science", "10.1126"),
    ("0028-0836", "Nature", "10.1038"),
    ("1476-4687", "Nature", "10.1038"),
    ("2041-1723", "Nature Communications", "10.1038"),
    ("1745-2473", "Nature Physics", "10.1038"),
    ("1745-2481", "Nature Physics", "10.1038"),
    ("1748-3387", "Nature Nanotechnology", "10.1038"),
    ("1748-3395", "Nature Nanotechnology", "10.1038"),
    ("0034-6748", "Review of Scientific Instruments", "10.1063"),
    ("1089-7623", "Review of Scientific Instruments", "10.1063"),
    ("0031-9007", "Physical Review Letters", "10.1103"),
    ("1079-7114", "Physical Review Letters", "10.1103"),
    ("0003-6951", "Applied Physics Letters", "10.1063"),
    ("1077-3118", "Applied Physics Letters", "10.1063"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookups() {
        let catalog = JournalCatalog::builtin();
        assert_eq!(catalog.journal_name("1936-0851"), Some("ACS Nano"));
        assert_eq!(catalog.prefix("0031-9007"), Some("10.1103"));
        assert_eq!(catalog.journal_name("0000-0000"), None);
    }

    #[test]
    fn test_name_for_doi_by_prefix() {
        let catalog = JournalCatalog::builtin();
        let doi = Doi::new("10.1103/PhysRevLett.126.010502");
        assert_eq!(catalog.name_for_doi(&doi), Some("Physical Review Letters"));

        let unknown = Doi::new("10.9999/whatever");
        assert_eq!(catalog.name_for_doi(&unknown), None);
    }
}
