use std::collections::HashSet;
use std::str::FromStr;

use anyhow::anyhow;

use crate::catalog::normalize_name;
use crate::table::{AttributeRow, StatTable};

/// Bar chart grouping mode, as selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMode {
    /// One series per attribute; entity names on the axis.
    GroupByEntity,
    /// One series per entity; attribute names on the axis.
    GroupByAttribute,
    /// Same series shape as GroupByEntity; stacking is the renderer's job.
    Stacked,
}

impl FromStr for BarMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(BarMode::GroupByEntity),
            "group-stat" => Ok(BarMode::GroupByAttribute),
            "stack" => Ok(BarMode::Stacked),
            other => Err(anyhow!(
                "unknown bar mode '{}' (expected group, group-stat, or stack)",
                other
            )),
        }
    }
}

/// A named sequence of (category, value) pairs. `None` is a gap: the entity
/// was never measured for that category, which is not the same as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub key: String,
    pub mode: BarMode,
    pub points: Vec<(String, Option<f64>)>,
}

/// Table view for display only. Columns end with "Name"; missing cells are
/// empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Position of one pie within the multi-pie grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub name: String,
    /// (attribute, value) slices, values verbatim; the renderer computes
    /// proportions.
    pub slices: Vec<(String, f64)>,
    pub cell: GridCell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieGrid {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieProjection {
    pub pies: Vec<PieChart>,
    pub grid: PieGrid,
}

/// Rows of `table` whose key is in `names`, sorted by name ascending.
/// The shared front half of every projection.
pub fn select<'t>(table: &'t StatTable, names: &[String]) -> Vec<&'t AttributeRow> {
    let wanted: HashSet<String> = names.iter().map(|n| normalize_name(n)).collect();
    let mut rows: Vec<&AttributeRow> = table
        .rows()
        .iter()
        .filter(|r| wanted.contains(r.name()))
        .collect();
    rows.sort_by(|a, b| a.name().cmp(b.name()));
    rows
}

/// Union of attribute keys across the selection, first-seen order.
fn union_columns(rows: &[&AttributeRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for (key, _) in row.attributes() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

pub fn project_table(table: &StatTable, names: &[String]) -> TableView {
    let selection = select(table, names);
    let mut columns = union_columns(&selection);
    columns.push("Name".to_string());

    let rows = selection
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = columns[..columns.len() - 1]
                .iter()
                .map(|col| row.get(col).map(format_value).unwrap_or_default())
                .collect();
            cells.push(row.name().to_string());
            cells
        })
        .collect();

    TableView { columns, rows }
}

/// Integer-valued stats print without a trailing ".0".
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub fn project_bars(table: &StatTable, names: &[String], mode: BarMode) -> Vec<ChartSeries> {
    let selection = select(table, names);
    if selection.is_empty() {
        return Vec::new();
    }
    let columns = union_columns(&selection);

    match mode {
        BarMode::GroupByEntity | BarMode::Stacked => columns
            .iter()
            .map(|col| ChartSeries {
                key: col.clone(),
                mode,
                points: selection
                    .iter()
                    .map(|row| (row.name().to_string(), row.get(col)))
                    .collect(),
            })
            .collect(),
        BarMode::GroupByAttribute => selection
            .iter()
            .map(|row| ChartSeries {
                key: row.name().to_string(),
                mode,
                points: columns
                    .iter()
                    .map(|col| (col.clone(), row.get(col)))
                    .collect(),
            })
            .collect(),
    }
}

pub fn project_pies(table: &StatTable, names: &[String]) -> PieProjection {
    let selection = select(table, names);
    let grid = grid_dimensions(selection.len());

    let mut pies = Vec::with_capacity(selection.len());
    let (mut row, mut col) = (0usize, 0usize);
    for entity in selection {
        pies.push(PieChart {
            name: entity.name().to_string(),
            slices: entity.attributes().to_vec(),
            cell: GridCell { row, col },
        });
        col += 1;
        if col >= grid.cols {
            col = 0;
            row += 1;
        }
    }

    PieProjection { pies, grid }
}

/// Near-square layout: side = ceil(sqrt(n)), side x side cells. Two pies are
/// the exception and sit side by side in a single row.
fn grid_dimensions(n: usize) -> PieGrid {
    if n == 0 {
        return PieGrid { rows: 0, cols: 0 };
    }
    let side = (n as f64).sqrt().ceil() as usize;
    if n == 2 {
        PieGrid { rows: 1, cols: side }
    } else {
        PieGrid { rows: side, cols: side }
    }
}
