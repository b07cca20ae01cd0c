use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::info;

use crate::catalog::CatalogIndex;
use crate::fetch::FetchStats;
use crate::table::{StatCache, StatTable};
use crate::CompareError;

/// A completed `ensure` batch: the full table as of that batch, stamped with
/// a sequence number that orders completions.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub seq: u64,
    pub table: StatTable,
}

/// Owns the catalog, the cache, and the fetcher for one interactive session.
///
/// The mutex covers the whole resolve/fetch/append phase, so two overlapping
/// `ensure` calls can never double-fetch a name or interleave their appends.
pub struct Session {
    catalog: CatalogIndex,
    fetcher: Box<dyn FetchStats>,
    cache: Mutex<StatCache>,
    seq: AtomicU64,
}

impl Session {
    pub fn new(catalog: CatalogIndex, fetcher: Box<dyn FetchStats>) -> Self {
        Self {
            catalog,
            fetcher,
            cache: Mutex::new(StatCache::default()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    /// Fetch whatever is missing from `names` and return a snapshot of the
    /// full table. Sequence numbers are assigned in completion order, under
    /// the lock, so a later snapshot always has a larger `seq`.
    pub fn ensure(&self, names: &[String]) -> Result<Snapshot, CompareError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let before = cache.table().len();
        let table = cache
            .ensure(names, &self.catalog, self.fetcher.as_ref())?
            .clone();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        info!(seq, new_rows = table.len() - before, "selection ensured");
        Ok(Snapshot { seq, table })
    }
}

/// Keeps the newest completed snapshot. Out-of-order completions are dropped
/// so a superseded fetch can never overwrite newer data.
#[derive(Debug, Default)]
pub struct Latest {
    seq: u64,
    table: Option<StatTable>,
}

impl Latest {
    /// Accept `snapshot` if it is newer than everything seen so far.
    pub fn accept(&mut self, snapshot: Snapshot) -> Option<&StatTable> {
        if snapshot.seq <= self.seq {
            return None;
        }
        self.seq = snapshot.seq;
        self.table = Some(snapshot.table);
        self.table.as_ref()
    }

    pub fn table(&self) -> Option<&StatTable> {
        self.table.as_ref()
    }
}

/// Split one line of user input into a selection. A single bare name becomes
/// a singleton selection; the core only ever sees a list.
pub fn parse_selection(line: &str) -> Vec<String> {
    line.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::fetch::stub::StubFetcher;

    fn make_session() -> Session {
        let catalog = CatalogIndex::build(vec![
            CatalogEntry {
                name: "a".to_string(),
                locator: "mem://a".to_string(),
            },
            CatalogEntry {
                name: "b".to_string(),
                locator: "mem://b".to_string(),
            },
        ]);
        let mut stats = HashMap::new();
        stats.insert("mem://a".to_string(), vec![("Hp".to_string(), 10.0)]);
        stats.insert("mem://b".to_string(), vec![("Hp".to_string(), 7.0)]);
        Session::new(catalog, Box::new(StubFetcher::new(stats)))
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let session = make_session();
        let first = session.ensure(&names(&["a"])).unwrap();
        let second = session.ensure(&names(&["a", "b"])).unwrap();
        assert!(second.seq > first.seq);
        assert_eq!(first.table.len(), 1);
        assert_eq!(second.table.len(), 2);
    }

    #[test]
    fn test_failed_ensure_keeps_partial_rows() {
        let session = make_session();
        let err = session.ensure(&names(&["a", "ghost"])).unwrap_err();
        assert!(matches!(err, CompareError::EntityUnavailable { .. }));

        // The table is still usable for the row committed before the failure.
        let snapshot = session.ensure(&names(&["a"])).unwrap();
        assert_eq!(snapshot.table.len(), 1);
    }

    #[test]
    fn test_latest_drops_stale_snapshots() {
        let session = make_session();
        let older = session.ensure(&names(&["a"])).unwrap();
        let newer = session.ensure(&names(&["a", "b"])).unwrap();

        let mut latest = Latest::default();
        assert!(latest.accept(newer).is_some());
        // The older completion arrives late and is dropped.
        assert!(latest.accept(older).is_none());
        assert_eq!(latest.table().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_selection_scalar_becomes_singleton() {
        assert_eq!(parse_selection("pikachu"), vec!["pikachu".to_string()]);
        assert_eq!(
            parse_selection("  pikachu   bulbasaur "),
            vec!["pikachu".to_string(), "bulbasaur".to_string()]
        );
        assert!(parse_selection("   ").is_empty());
    }
}
