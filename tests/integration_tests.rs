use std::cell::Cell;
use std::collections::HashMap;

use dexgraph::catalog::{CatalogEntry, CatalogIndex};
use dexgraph::fetch::FetchStats;
use dexgraph::project::{self, BarMode, GridCell, PieGrid};
use dexgraph::render;
use dexgraph::session::{Latest, Session};
use dexgraph::{CompareError, OutputFormat, RenderOptions};

/// In-memory stand-in for the HTTP stat source.
struct MemoryFetcher {
    stats: HashMap<String, Vec<(String, f64)>>,
    calls: Cell<usize>,
}

impl MemoryFetcher {
    fn new(stats: HashMap<String, Vec<(String, f64)>>) -> Self {
        Self {
            stats,
            calls: Cell::new(0),
        }
    }
}

impl FetchStats for MemoryFetcher {
    fn fetch(&self, locator: &str) -> Result<Vec<(String, f64)>, CompareError> {
        self.calls.set(self.calls.get() + 1);
        self.stats
            .get(locator)
            .cloned()
            .ok_or_else(|| CompareError::FetchFailed {
                locator: locator.to_string(),
                reason: "not in memory".to_string(),
            })
    }
}

fn make_catalog() -> CatalogIndex {
    CatalogIndex::build(vec![
        CatalogEntry {
            name: "a".to_string(),
            locator: "mem://a".to_string(),
        },
        CatalogEntry {
            name: "b".to_string(),
            locator: "mem://b".to_string(),
        },
        CatalogEntry {
            name: "c".to_string(),
            locator: "mem://c".to_string(),
        },
        CatalogEntry {
            name: "d".to_string(),
            locator: "mem://d".to_string(),
        },
    ])
}

fn make_stats() -> HashMap<String, Vec<(String, f64)>> {
    let mut stats = HashMap::new();
    stats.insert(
        "mem://a".to_string(),
        vec![("Hp".to_string(), 10.0), ("Atk".to_string(), 5.0)],
    );
    stats.insert(
        "mem://b".to_string(),
        vec![("Hp".to_string(), 7.0), ("Atk".to_string(), 8.0)],
    );
    stats.insert(
        "mem://c".to_string(),
        vec![("Hp".to_string(), 3.0), ("Atk".to_string(), 4.0)],
    );
    stats.insert(
        "mem://d".to_string(),
        vec![("Hp".to_string(), 9.0), ("Atk".to_string(), 2.0)],
    );
    stats
}

fn make_session() -> Session {
    Session::new(make_catalog(), Box::new(MemoryFetcher::new(make_stats())))
}

fn names(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

#[test]
fn test_end_to_end_bar_projection() {
    let session = make_session();
    let snapshot = session.ensure(&names(&["A", "B"])).unwrap();
    assert_eq!(snapshot.table.len(), 2);

    let series = project::project_bars(&snapshot.table, &names(&["A", "B"]), BarMode::GroupByEntity);
    assert_eq!(series.len(), 2);

    let hp = series.iter().find(|s| s.key == "Hp").unwrap();
    assert_eq!(
        hp.points,
        vec![("A".to_string(), Some(10.0)), ("B".to_string(), Some(7.0))]
    );
    let atk = series.iter().find(|s| s.key == "Atk").unwrap();
    assert_eq!(
        atk.points,
        vec![("A".to_string(), Some(5.0)), ("B".to_string(), Some(8.0))]
    );
}

#[test]
fn test_end_to_end_pie_projection() {
    let session = make_session();
    let snapshot = session.ensure(&names(&["A", "B"])).unwrap();

    let projection = project::project_pies(&snapshot.table, &names(&["A", "B"]));
    assert_eq!(projection.grid, PieGrid { rows: 1, cols: 2 });
    assert_eq!(projection.pies.len(), 2);
    assert_eq!(projection.pies[0].name, "A");
    assert_eq!(projection.pies[1].cell, GridCell { row: 0, col: 1 });
}

#[test]
fn test_unknown_name_keeps_partial_progress() {
    let session = make_session();
    let err = session.ensure(&names(&["A", "GHOST"])).unwrap_err();
    match err {
        CompareError::EntityUnavailable { name, source } => {
            assert_eq!(name, "GHOST");
            assert!(matches!(*source, CompareError::UnknownEntity { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Row A was committed before the failure and stays queryable.
    let snapshot = session.ensure(&names(&["A"])).unwrap();
    assert_eq!(snapshot.table.len(), 1);
    assert!(snapshot.table.contains("A"));
}

#[test]
fn test_successive_selections_fetch_incrementally() {
    let stats = make_stats();
    let fetcher = MemoryFetcher::new(stats);
    let catalog = make_catalog();
    let mut cache = dexgraph::table::StatCache::default();

    // First interaction fetches both names, the second only the new one,
    // the third nothing at all.
    cache.ensure(&names(&["A", "B"]), &catalog, &fetcher).unwrap();
    assert_eq!(fetcher.calls.get(), 2);
    cache
        .ensure(&names(&["A", "B", "C"]), &catalog, &fetcher)
        .unwrap();
    assert_eq!(fetcher.calls.get(), 3);
    let table = cache
        .ensure(&names(&["A", "B", "C"]), &catalog, &fetcher)
        .unwrap();
    assert_eq!(fetcher.calls.get(), 3);
    assert_eq!(table.len(), 3);
}

#[test]
fn test_stale_completion_is_dropped() {
    let session = make_session();
    let older = session.ensure(&names(&["A"])).unwrap();
    let newer = session.ensure(&names(&["A", "B"])).unwrap();

    let mut latest = Latest::default();
    assert!(latest.accept(newer).is_some());
    assert!(latest.accept(older).is_none());
    assert_eq!(latest.table().unwrap().len(), 2);
}

#[test]
fn test_table_view_for_display() {
    let session = make_session();
    let snapshot = session.ensure(&names(&["B", "A"])).unwrap();

    let view = project::project_table(&snapshot.table, &names(&["B", "A"]));
    assert_eq!(view.columns, vec!["Hp", "Atk", "Name"]);
    // Rows come out sorted by name regardless of request order.
    assert_eq!(view.rows[0], vec!["10", "5", "A"]);
    assert_eq!(view.rows[1], vec!["7", "8", "B"]);
}

#[test]
fn test_render_bars_produces_png() {
    let session = make_session();
    let snapshot = session.ensure(&names(&["A", "B", "C"])).unwrap();
    let series =
        project::project_bars(&snapshot.table, &names(&["A", "B", "C"]), BarMode::GroupByEntity);

    let bytes = render::render_bars(&series, &RenderOptions::default()).unwrap();
    assert!(is_valid_png(&bytes));
}

#[test]
fn test_render_stacked_bars_produces_png() {
    let session = make_session();
    let snapshot = session.ensure(&names(&["A", "B"])).unwrap();
    let series = project::project_bars(&snapshot.table, &names(&["A", "B"]), BarMode::Stacked);

    let bytes = render::render_bars(&series, &RenderOptions::default()).unwrap();
    assert!(is_valid_png(&bytes));
}

#[test]
fn test_render_pies_produces_svg() {
    let session = make_session();
    let snapshot = session.ensure(&names(&["A", "B", "C", "D"])).unwrap();
    let projection =
        project::project_pies(&snapshot.table, &names(&["A", "B", "C", "D"]));
    assert_eq!(projection.grid, PieGrid { rows: 2, cols: 2 });

    let options = RenderOptions {
        format: OutputFormat::Svg,
        title: Some("Stat Breakdown".to_string()),
        ..RenderOptions::default()
    };
    let bytes = render::render_pies(&projection, &options).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("<?xml") || text.contains("<svg"));
}
