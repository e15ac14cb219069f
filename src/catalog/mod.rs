//! The catalog of tracked tools.
//!
//! The catalog is a YAML mapping from display name to record. Records that
//! are not usable entries (bare markers such as `none:`, or mappings without
//! a link) are kept verbatim as stubs so a rewrite never loses them.

mod entry;
mod store;

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

pub use entry::{CatalogEntry, SecurityStatus, ToolType};
pub use store::{CatalogStore, PLACEHOLDER_DOCUMENT};

/// A single value in the catalog mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogRecord {
    Entry(CatalogEntry),
    /// Inert record, persisted untouched.
    Stub(Value),
}

impl CatalogRecord {
    /// Classify a raw record found under `name`.
    pub fn classify(name: &str, value: Value) -> Self {
        if !value.is_mapping() {
            return CatalogRecord::Stub(value);
        }
        match serde_yaml::from_value::<CatalogEntry>(value.clone()) {
            Ok(mut entry) if entry.is_reconcilable() => {
                entry.name = name.to_string();
                CatalogRecord::Entry(entry)
            }
            Ok(_) => CatalogRecord::Stub(value),
            Err(e) => {
                log::warn!("Treating malformed record {:?} as inert: {}", name, e);
                CatalogRecord::Stub(value)
            }
        }
    }

    fn to_value(&self) -> Result<Value, serde_yaml::Error> {
        match self {
            CatalogRecord::Entry(entry) => serde_yaml::to_value(entry),
            CatalogRecord::Stub(value) => Ok(value.clone()),
        }
    }
}

/// In-memory catalog, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: BTreeMap<String, CatalogRecord>,
}

impl Catalog {
    /// Build a catalog from a parsed YAML document.
    ///
    /// Fails when the document is not a mapping with scalar keys.
    pub fn from_yaml(document: Value) -> Result<Self, String> {
        let mapping = match document {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Err("no tools detected".to_string()),
            other => return Err(format!("expected a mapping of tools, found {:?}", other)),
        };

        let mut records = BTreeMap::new();
        for (key, value) in mapping {
            let name = match key {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => return Err(format!("invalid tool name {:?}", other)),
            };
            let record = CatalogRecord::classify(&name, value);
            records.insert(name, record);
        }
        Ok(Self { records })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut mapping = Mapping::new();
        for (name, record) in &self.records {
            mapping.insert(Value::String(name.clone()), record.to_value()?);
        }
        serde_yaml::to_string(&mapping)
    }

    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogRecord> {
        self.records.get(name)
    }

    /// Store `entry` under its own name, replacing any previous record.
    pub fn insert_entry(&mut self, entry: CatalogEntry) {
        self.records
            .insert(entry.name.clone(), CatalogRecord::Entry(entry));
    }

    pub fn remove(&mut self, name: &str) -> Option<CatalogRecord> {
        self.records.remove(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Catalog, String> {
        Catalog::from_yaml(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_classifies_entries_and_stubs() {
        let catalog = parse(
            "ToolX:\n  link: https://site/toolx/\n  latest version: '1.0'\nnone:\nNoLink:\n  rating: 3.0\n",
        )
        .unwrap();

        assert_eq!(catalog.len(), 3);
        match catalog.get("ToolX") {
            Some(CatalogRecord::Entry(entry)) => {
                assert_eq!(entry.name, "ToolX");
                assert_eq!(entry.latest_version, "1.0");
            }
            other => panic!("expected entry, got {:?}", other),
        }
        assert_eq!(catalog.get("none"), Some(&CatalogRecord::Stub(Value::Null)));
        assert!(matches!(catalog.get("NoLink"), Some(CatalogRecord::Stub(_))));
    }

    #[test]
    fn test_malformed_mapping_is_a_stub() {
        let catalog = parse("Broken:\n  link: [1, 2]\n").unwrap();
        assert!(matches!(catalog.get("Broken"), Some(CatalogRecord::Stub(_))));
    }

    #[test]
    fn test_rejects_non_mapping_documents() {
        assert!(Catalog::from_yaml(Value::Null).is_err());
        assert!(parse("- a\n- b\n").is_err());
        assert!(parse("just text").is_err());
    }

    #[test]
    fn test_stubs_survive_rewrite() {
        let catalog = parse("none:\nmarker: pending\n").unwrap();
        let reparsed = parse(&catalog.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed, catalog);
    }

    #[test]
    fn test_names_are_sorted() {
        let catalog = parse(
            "Zeta:\n  link: https://site/zeta/\nAlpha:\n  link: https://site/alpha/\n",
        )
        .unwrap();
        assert_eq!(catalog.names(), vec!["Alpha", "Zeta"]);

        let yaml = catalog.to_yaml().unwrap();
        assert!(yaml.find("Alpha:").unwrap() < yaml.find("Zeta:").unwrap());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut catalog = Catalog::default();
        catalog.insert_entry(CatalogEntry::new("ToolX", "https://site/toolx/"));
        assert!(!catalog.is_empty());
        assert!(catalog.remove("ToolX").is_some());
        assert!(catalog.is_empty());
    }
}
