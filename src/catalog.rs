use std::collections::HashMap;

use crate::CompareError;

/// Normalize a raw entity name the way the catalog displays it: first letter
/// uppercased, the rest untouched.
///
/// Catalog keys, selection input, and table row keys all go through this one
/// function, so a name the catalog listed always resolves no matter how the
/// user typed it.
pub fn normalize_name(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One directory listing entry: display name plus the locator to fetch its
/// stats from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub locator: String,
}

/// Name -> locator index, built once at startup from the directory listing.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    by_name: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Build the index from a directory listing. Entry names are normalized;
    /// if two entries normalize to the same key the first one wins.
    pub fn build(listing: Vec<CatalogEntry>) -> Self {
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(listing.len());
        let mut by_name = HashMap::with_capacity(listing.len());
        for entry in listing {
            let name = normalize_name(&entry.name);
            if by_name.contains_key(&name) {
                continue;
            }
            by_name.insert(name.clone(), entries.len());
            entries.push(CatalogEntry {
                name,
                locator: entry.locator,
            });
        }
        CatalogIndex { entries, by_name }
    }

    /// Resolve a (not necessarily normalized) name to its locator.
    pub fn resolve(&self, name: &str) -> Result<&str, CompareError> {
        let key = normalize_name(name);
        self.by_name
            .get(&key)
            .map(|&idx| self.entries[idx].locator.as_str())
            .ok_or_else(|| CompareError::UnknownEntity { name: key })
    }

    /// Display names in listing order, for building selection options.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
