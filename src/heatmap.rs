//! Heatmap rendering of interaction matrices
//!
//! One PNG per stored segment pair, drawn cell by cell with an intensity
//! ramp scaled to the matrix maximum. Matrices are read-only here; rendering
//! runs in parallel since every matrix owns its own output file.

use crate::matrix::{InteractionMatrix, MatrixStore};
use crate::types::{ChimeraMapError, Result};
use log::{debug, info};
use plotters::prelude::*;
use rayon::prelude::*;
use std::path::Path;

// Endpoints of the "Blues" ramp: near-white for zero, dark blue for the max
const RAMP_LOW: (u8, u8, u8) = (247, 251, 255);
const RAMP_HIGH: (u8, u8, u8) = (8, 48, 107);

fn plot_err<E: std::fmt::Display>(e: E) -> ChimeraMapError {
    ChimeraMapError::Plot(e.to_string())
}

fn intensity_color(count: u32, max: u32) -> RGBColor {
    let t = if max == 0 {
        0.0
    } else {
        count as f64 / max as f64
    };
    let lerp = |a: u8, b: u8| (a as f64 + t * (b as f64 - a as f64)).round() as u8;
    RGBColor(
        lerp(RAMP_LOW.0, RAMP_HIGH.0),
        lerp(RAMP_LOW.1, RAMP_HIGH.1),
        lerp(RAMP_LOW.2, RAMP_HIGH.2),
    )
}

fn output_filename(row_segment: &str, col_segment: &str) -> String {
    format!(
        "{}_{}.png",
        row_segment.replace('/', "_"),
        col_segment.replace('/', "_")
    )
}

/// Render every stored matrix as a PNG in `output_dir`
pub fn render_all<P: AsRef<Path>>(store: &MatrixStore, output_dir: P) -> Result<()> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let jobs: Vec<(&str, &str, &InteractionMatrix)> = store.iter().collect();
    info!(
        "Rendering {} heatmaps to {}",
        jobs.len(),
        output_dir.display()
    );

    jobs.into_par_iter()
        .try_for_each(|(row_segment, col_segment, matrix)| {
            render_heatmap(row_segment, col_segment, matrix, output_dir)
        })?;

    info!("Heatmap rendering complete");
    Ok(())
}

/// Render one matrix; the row segment labels the y axis, the column segment
/// the x axis, matching the stored orientation.
pub fn render_heatmap(
    row_segment: &str,
    col_segment: &str,
    matrix: &InteractionMatrix,
    output_dir: &Path,
) -> Result<()> {
    if matrix.rows() == 0 || matrix.cols() == 0 {
        debug!(
            "Skipping empty-axis heatmap for ({}, {})",
            row_segment, col_segment
        );
        return Ok(());
    }

    let filename = output_dir.join(output_filename(row_segment, col_segment));
    debug!(
        "Rendering heatmap ({}, {}) -> {}",
        row_segment,
        col_segment,
        filename.display()
    );

    let root = BitMapBackend::new(&filename, (1000, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let root = root.margin(10, 10, 10, 10);

    let max = matrix.max();
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} x {}", row_segment, col_segment),
            ("sans-serif", 26),
        )
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(0u32..matrix.cols() as u32, 0u32..matrix.rows() as u32)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(col_segment)
        .y_desc(row_segment)
        .draw()
        .map_err(plot_err)?;

    let cells = (0..matrix.rows()).flat_map(|row| {
        (0..matrix.cols()).filter_map(move |col| {
            let count = matrix.get(row, col);
            if count == 0 {
                return None;
            }
            Some(Rectangle::new(
                [
                    (col as u32, row as u32),
                    (col as u32 + 1, row as u32 + 1),
                ],
                intensity_color(count, max).filled(),
            ))
        })
    });
    chart.draw_series(cells).map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
