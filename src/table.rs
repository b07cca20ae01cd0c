use tracing::debug;

use crate::catalog::{normalize_name, CatalogIndex};
use crate::fetch::FetchStats;
use crate::CompareError;

/// One fetched entity: normalized name plus its attribute pairs in the order
/// the source listed them.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRow {
    name: String,
    attributes: Vec<(String, f64)>,
}

impl AttributeRow {
    pub fn new(name: impl Into<String>, attributes: Vec<(String, f64)>) -> Self {
        Self {
            name: normalize_name(&name.into()),
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, f64)] {
        &self.attributes
    }

    /// Look up one attribute. Absent means "not measured", never zero.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|&(_, v)| v)
    }
}

/// Session-lifetime table of fetched rows, keyed uniquely by normalized name.
/// Rows are append-only and never mutated once inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatTable {
    rows: Vec<AttributeRow>,
}

impl StatTable {
    pub fn rows(&self) -> &[AttributeRow] {
        &self.rows
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeRow> {
        let key = normalize_name(name);
        self.rows.iter().find(|r| r.name == key)
    }

    /// Union of attribute keys across all rows, first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for (key, _) in &row.attributes {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn push(&mut self, row: AttributeRow) {
        if !self.contains(&row.name) {
            self.rows.push(row);
        }
    }
}

/// Incremental cache over the stat table: each distinct entity is fetched at
/// most once per session, no matter how often it reappears in selections.
#[derive(Debug, Default)]
pub struct StatCache {
    table: StatTable,
}

impl StatCache {
    pub fn table(&self) -> &StatTable {
        &self.table
    }

    /// Make every requested name present in the table, fetching the missing
    /// ones in request order, then return the full table. Rows committed
    /// before a failure stay committed.
    pub fn ensure(
        &mut self,
        names: &[String],
        catalog: &CatalogIndex,
        fetcher: &dyn FetchStats,
    ) -> Result<&StatTable, CompareError> {
        for name in self.missing_names(names) {
            let locator = catalog.resolve(&name).map_err(|e| unavailable(&name, e))?;
            debug!(%name, locator, "fetching stats");
            let attributes = fetcher.fetch(locator).map_err(|e| unavailable(&name, e))?;
            self.table.push(AttributeRow::new(name, attributes));
        }
        Ok(&self.table)
    }

    /// Requested names not yet in the table: normalized, request order,
    /// duplicates collapsed to their first occurrence.
    fn missing_names(&self, names: &[String]) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for raw in names {
            let name = normalize_name(raw);
            if self.table.contains(&name) || missing.contains(&name) {
                continue;
            }
            missing.push(name);
        }
        missing
    }
}

fn unavailable(name: &str, source: CompareError) -> CompareError {
    CompareError::EntityUnavailable {
        name: name.to_string(),
        source: Box::new(source),
    }
}
