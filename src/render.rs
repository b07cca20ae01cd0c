use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::element::Polygon;
use plotters::prelude::*;

use crate::palette;
use crate::project::{BarMode, ChartSeries, PieChart, PieProjection};
use crate::{OutputFormat, RenderOptions};

const BAR_GROUP_WIDTH: f64 = 0.8;

/// Render bar series to encoded image bytes, PNG or SVG per the options.
pub fn render_bars(series: &[ChartSeries], options: &RenderOptions) -> Result<Vec<u8>> {
    if series.is_empty() {
        anyhow::bail!("Cannot render a bar chart with no series");
    }
    let (width, height) = (options.width, options.height);
    let title = options.title.as_deref();
    match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; (width * height * 3) as usize];
            {
                let root =
                    BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                draw_bars(&root, series, title)?;
            }
            encode_png(&buffer, width, height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw_bars(&root, series, title)?;
            }
            Ok(svg.into_bytes())
        }
    }
}

/// Render the pie grid to encoded image bytes, PNG or SVG per the options.
pub fn render_pies(projection: &PieProjection, options: &RenderOptions) -> Result<Vec<u8>> {
    if projection.pies.is_empty() {
        anyhow::bail!("Cannot render an empty pie grid");
    }
    let (width, height) = (options.width, options.height);
    let title = options.title.as_deref();
    match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; (width * height * 3) as usize];
            {
                let root =
                    BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                draw_pies(&root, projection, title)?;
            }
            encode_png(&buffer, width, height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw_pies(&root, projection, title)?;
            }
            Ok(svg.into_bytes())
        }
    }
}

fn draw_bars<DB>(
    root: &DrawingArea<DB, Shift>,
    series: &[ChartSeries],
    title: Option<&str>,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    // Every series shares one category list by construction.
    let categories: Vec<String> = series[0].points.iter().map(|(c, _)| c.clone()).collect();
    let num_categories = categories.len();
    let num_series = series.len();
    let stacked = series[0].mode == BarMode::Stacked;

    let y_max = if stacked {
        (0..num_categories)
            .map(|i| series.iter().filter_map(|s| s.points[i].1).sum::<f64>())
            .fold(0.0f64, f64::max)
    } else {
        series
            .iter()
            .flat_map(|s| s.points.iter().filter_map(|(_, v)| *v))
            .fold(0.0f64, f64::max)
    };
    let y_top = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title.unwrap_or(""), ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..(num_categories as f64), 0.0..y_top)
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .x_labels(num_categories)
        .x_label_formatter(&|x| {
            let idx = *x as usize;
            categories.get(idx).cloned().unwrap_or_default()
        })
        .draw()
        .context("Failed to draw mesh")?;

    if stacked {
        // Cumulative rectangles per category; series order fixes the stack
        // order. Gaps contribute nothing to the stack.
        let mut offsets = vec![0.0f64; num_categories];
        for (series_idx, s) in series.iter().enumerate() {
            let color = palette::color_for(series_idx);
            let mut rects = Vec::new();
            for (cat_idx, (_, value)) in s.points.iter().enumerate() {
                let Some(v) = value else { continue };
                let x_center = cat_idx as f64 + 0.5;
                let start = offsets[cat_idx];
                let end = start + v;
                offsets[cat_idx] = end;
                rects.push(Rectangle::new(
                    [
                        (x_center - BAR_GROUP_WIDTH / 2.0, start),
                        (x_center + BAR_GROUP_WIDTH / 2.0, end),
                    ],
                    color.filled(),
                ));
            }
            chart
                .draw_series(rects)
                .context("Failed to draw bar series")?
                .label(s.key.clone())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                });
        }
    } else {
        // Dodged rectangles, one slot per series within each category.
        let bar_width = BAR_GROUP_WIDTH / num_series as f64;
        for (series_idx, s) in series.iter().enumerate() {
            let color = palette::color_for(series_idx);
            let mut rects = Vec::new();
            for (cat_idx, (_, value)) in s.points.iter().enumerate() {
                let Some(v) = value else { continue };
                let x_offset =
                    (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * bar_width;
                let x_center = cat_idx as f64 + 0.5 + x_offset;
                rects.push(Rectangle::new(
                    [
                        (x_center - bar_width / 2.0, 0.0),
                        (x_center + bar_width / 2.0, *v),
                    ],
                    color.filled(),
                ));
            }
            chart
                .draw_series(rects)
                .context("Failed to draw bar series")?
                .label(s.key.clone())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                });
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .context("Failed to draw legend")?;

    root.present().context("Failed to present drawing")?;
    Ok(())
}

fn draw_pies<DB>(
    root: &DrawingArea<DB, Shift>,
    projection: &PieProjection,
    title: Option<&str>,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    let outer = match title {
        Some(t) => root
            .titled(t, ("sans-serif", 20))
            .context("Failed to draw title")?,
        None => root.clone(),
    };

    // Color slices by attribute name so every pie colors "Hp" alike even if
    // entities carry different stat sets.
    let mut color_keys: Vec<String> = Vec::new();
    for pie in &projection.pies {
        for (key, _) in &pie.slices {
            if !color_keys.iter().any(|c| c == key) {
                color_keys.push(key.clone());
            }
        }
    }

    let cells = outer.split_evenly((projection.grid.rows, projection.grid.cols));
    for pie in &projection.pies {
        let cell = &cells[pie.cell.row * projection.grid.cols + pie.cell.col];
        draw_pie_cell(cell, pie, &color_keys)?;
    }

    root.present().context("Failed to present drawing")?;
    Ok(())
}

fn draw_pie_cell<DB>(
    cell: &DrawingArea<DB, Shift>,
    pie: &PieChart,
    color_keys: &[String],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (w, h) = cell.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2 + 8);
    let radius = (w.min(h) as f64 / 2.0) * 0.75;

    cell.draw(&Text::new(
        pie.name.clone(),
        (w as i32 / 2 - pie.name.len() as i32 * 4, 4),
        ("sans-serif", 16),
    ))
    .context("Failed to draw pie title")?;

    let total: f64 = pie.slices.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        return Ok(()); // nothing to slice
    }

    // Slice proportions come from the raw values; start at 12 o'clock.
    let mut angle = -std::f64::consts::FRAC_PI_2;
    for (key, value) in &pie.slices {
        let sweep = value / total * std::f64::consts::TAU;
        let color_idx = color_keys.iter().position(|k| k == key).unwrap_or(0);
        let color = palette::color_for(color_idx);
        cell.draw(&Polygon::new(
            sector_points(center, radius, angle, angle + sweep),
            color.filled(),
        ))
        .context("Failed to draw pie slice")?;
        angle += sweep;
    }
    Ok(())
}

/// Pixel-space polygon approximating a circle sector.
fn sector_points(center: (i32, i32), radius: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let mut points = vec![center];
    let steps = (((end - start).abs() / 0.05).ceil() as usize).max(2);
    for i in 0..=steps {
        let a = start + (end - start) * (i as f64 / steps as f64);
        points.push((
            center.0 + (radius * a.cos()).round() as i32,
            center.1 + (radius * a.sin()).round() as i32,
        ));
    }
    points
}

/// Encode an RGB buffer as PNG.
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}
