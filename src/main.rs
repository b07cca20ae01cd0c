use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use dexgraph::catalog::CatalogIndex;
use dexgraph::fetch::HttpFetcher;
use dexgraph::project::{self, BarMode};
use dexgraph::render;
use dexgraph::session::{parse_selection, Latest, Session};
use dexgraph::table::StatTable;
use dexgraph::{OutputFormat, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "dexgraph")]
#[command(about = "Compare creature base stats as tables, bar charts, and pie grids", long_about = None)]
struct Args {
    /// Base URL of the stats API directory
    #[arg(long, default_value = HttpFetcher::DEFAULT_BASE_URL)]
    base_url: String,

    /// Output image width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Output image height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Output image format: png or svg
    #[arg(long, default_value = "png")]
    format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every entity name the catalog offers
    List,
    /// Print the stat table for a selection as CSV
    Table {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Render a bar chart comparing the selection
    Bars {
        #[arg(required = true)]
        names: Vec<String>,
        /// Bar grouping: group, group-stat, or stack
        #[arg(long, default_value = "group")]
        mode: String,
        /// Output file (defaults to bars.png / bars.svg)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render a grid of per-entity pie charts
    Pies {
        #[arg(required = true)]
        names: Vec<String>,
        /// Output file (defaults to pies.png / pies.svg)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read selections from stdin, one per line, re-rendering on each
    Watch {
        /// Directory the rendered files are written into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Bar grouping: group, group-stat, or stack
        #[arg(long, default_value = "group")]
        mode: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let format = parse_format(&args.format)?;

    let fetcher = HttpFetcher::new(args.base_url.as_str());
    let listing = fetcher
        .fetch_directory()
        .context("Failed to fetch the catalog listing")?;
    let catalog = CatalogIndex::build(listing);
    let session = Session::new(catalog, Box::new(fetcher));

    match args.command {
        Command::List => {
            for name in session.catalog().names() {
                println!("{}", name);
            }
        }
        Command::Table { names } => {
            let snapshot = session.ensure(&names)?;
            write_table_csv(&snapshot.table, &names, io::stdout())?;
        }
        Command::Bars { names, mode, out } => {
            let mode: BarMode = mode.parse()?;
            let snapshot = session.ensure(&names)?;
            let series = project::project_bars(&snapshot.table, &names, mode);
            let options = render_options(args.width, args.height, &format, "Base Stat Comparison");
            let bytes = render::render_bars(&series, &options)?;
            let out = out.unwrap_or_else(|| PathBuf::from(file_name("bars", &format)));
            fs::write(&out, bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("{}", out.display());
        }
        Command::Pies { names, out } => {
            let snapshot = session.ensure(&names)?;
            let projection = project::project_pies(&snapshot.table, &names);
            let options = render_options(args.width, args.height, &format, "Stat Breakdown");
            let bytes = render::render_pies(&projection, &options)?;
            let out = out.unwrap_or_else(|| PathBuf::from(file_name("pies", &format)));
            fs::write(&out, bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("{}", out.display());
        }
        Command::Watch { out_dir, mode } => {
            let mode: BarMode = mode.parse()?;
            watch_loop(&session, &out_dir, mode, &format, args.width, args.height)?;
        }
    }

    Ok(())
}

fn parse_format(raw: &str) -> Result<OutputFormat> {
    match raw {
        "png" => Ok(OutputFormat::Png),
        "svg" => Ok(OutputFormat::Svg),
        other => anyhow::bail!("unknown format '{}' (expected png or svg)", other),
    }
}

fn render_options(width: u32, height: u32, format: &OutputFormat, title: &str) -> RenderOptions {
    RenderOptions {
        width,
        height,
        format: format.clone(),
        title: Some(title.to_string()),
    }
}

fn file_name(stem: &str, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Png => format!("{}.png", stem),
        OutputFormat::Svg => format!("{}.svg", stem),
    }
}

fn write_table_csv<W: io::Write>(table: &StatTable, names: &[String], writer: W) -> Result<()> {
    let view = project::project_table(table, names);
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(&view.columns)
        .context("Failed to write CSV header")?;
    for row in &view.rows {
        csv_writer
            .write_record(row)
            .context("Failed to write CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Interactive loop: each stdin line is a whitespace-separated selection.
/// Already-fetched entities are served from the cache, so successive lines
/// only hit the network for newly added names. A failed line keeps the
/// previous renders and the loop alive.
fn watch_loop(
    session: &Session,
    out_dir: &Path,
    mode: BarMode,
    format: &OutputFormat,
    width: u32,
    height: u32,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut latest = Latest::default();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read selection from stdin")?;
        let names = parse_selection(&line);
        if names.is_empty() {
            continue;
        }

        let snapshot = match session.ensure(&names) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "selection failed; keeping previous table");
                continue;
            }
        };
        let Some(table) = latest.accept(snapshot) else {
            continue; // stale completion, newer result already rendered
        };

        let series = project::project_bars(table, &names, mode);
        if !series.is_empty() {
            let options = render_options(width, height, format, "Base Stat Comparison");
            let bytes = render::render_bars(&series, &options)?;
            let path = out_dir.join(file_name("bars", format));
            fs::write(&path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let projection = project::project_pies(table, &names);
        if !projection.pies.is_empty() {
            let options = render_options(width, height, format, "Stat Breakdown");
            let bytes = render::render_pies(&projection, &options)?;
            let path = out_dir.join(file_name("pies", format));
            fs::write(&path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let csv_path = out_dir.join("table.csv");
        let csv_file = fs::File::create(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        write_table_csv(table, &names, csv_file)?;

        println!(
            "rendered {} entities into {}",
            projection.pies.len(),
            out_dir.display()
        );
    }

    Ok(())
}
