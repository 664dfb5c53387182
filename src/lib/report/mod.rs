//! QC summary figure: UMI depth against percent-intronic-reads density,
//! for the full barcode population and for the selected subset.
//!
//! The figure is a secondary deliverable. Every failure in here is mapped
//! to [`SelectError::Render`] so the caller can degrade it to a warning.

use crate::core::error::{Result, SelectError};
use crate::dataset::CountsDataset;
use crate::selection::Selection;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const FIGURE_SIZE: (u32, u32) = (1000, 800);
const GRID_X: usize = 100;
const GRID_Y: usize = 100;

type Panel<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Axis ranges shared by both panels, derived from the full population so
/// the panels stay visually comparable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRanges {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Render the two-panel summary figure at `path`.
pub fn render_summary(dataset: &CountsDataset, selection: &Selection, path: &Path) -> Result<()> {
    draw_summary(dataset, selection, path).map_err(|e| SelectError::Render(e.to_string()))?;
    info!("Saved summary plot as {}", path.display());
    Ok(())
}

fn draw_summary(dataset: &CountsDataset, selection: &Selection, path: &Path) -> DrawResult {
    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));

    let qc = dataset
        .umi_counts
        .as_deref()
        .zip(dataset.pct_intronic.as_deref());
    let ranges = qc.and_then(|(umi, pct)| axis_ranges(umi, pct));

    for (panel_idx, panel) in panels.iter().enumerate() {
        let (title, subset) = if panel_idx == 0 {
            ("All barcodes", None)
        } else {
            ("Selected barcodes", Some(selection.indices()))
        };

        match (qc, ranges) {
            (Some((umi, pct)), Some(ranges)) => {
                let points = paired_points(umi, pct, subset);
                draw_density_panel(panel, title, &points, ranges)?;
            }
            _ => draw_placeholder_panel(panel, title)?,
        }
    }

    root.present()?;
    Ok(())
}

/// Compute panel ranges over log10(UMI) × percent-intronic. Barcodes whose
/// UMI count cannot be placed on the log axis (zero, negative, NaN) are
/// excluded; `None` when nothing plottable remains.
pub fn axis_ranges(umi_counts: &[f64], pct_intronic: &[f64]) -> Option<AxisRanges> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for (x, y) in paired_points(umi_counts, pct_intronic, None) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    if !x_min.is_finite() || !y_min.is_finite() {
        return None;
    }

    // a degenerate span cannot host a coordinate axis; pad it
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }

    Some(AxisRanges {
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

/// Raw counts on a fixed grid; the renderer applies its own log shading.
pub fn histogram2d(
    points: impl IntoIterator<Item = (f64, f64)>,
    ranges: AxisRanges,
    nx: usize,
    ny: usize,
) -> Vec<Vec<u32>> {
    let mut bins = vec![vec![0u32; ny]; nx];
    let x_span = ranges.x_max - ranges.x_min;
    let y_span = ranges.y_max - ranges.y_min;

    for (x, y) in points {
        if x < ranges.x_min || x > ranges.x_max || y < ranges.y_min || y > ranges.y_max {
            continue;
        }
        let ix = (((x - ranges.x_min) / x_span * nx as f64) as usize).min(nx - 1);
        let iy = (((y - ranges.y_min) / y_span * ny as f64) as usize).min(ny - 1);
        bins[ix][iy] += 1;
    }
    bins
}

fn paired_points(
    umi_counts: &[f64],
    pct_intronic: &[f64],
    subset: Option<&[usize]>,
) -> Vec<(f64, f64)> {
    let n = umi_counts.len().min(pct_intronic.len());
    let pairs: Vec<(f64, f64)> = match subset {
        Some(indices) => indices
            .iter()
            .filter(|&&i| i < n)
            .map(|&i| (umi_counts[i], pct_intronic[i]))
            .collect(),
        None => (0..n).map(|i| (umi_counts[i], pct_intronic[i])).collect(),
    };

    pairs
        .into_iter()
        .filter(|&(u, p)| u > 0.0 && u.is_finite() && p.is_finite())
        .map(|(u, p)| (u.log10(), p))
        .collect()
}

fn draw_density_panel(
    panel: &Panel<'_>,
    title: &str,
    points: &[(f64, f64)],
    ranges: AxisRanges,
) -> DrawResult {
    let mut chart = ChartBuilder::on(panel)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(ranges.x_min..ranges.x_max, ranges.y_min..ranges.y_max)?;
    chart
        .configure_mesh()
        .x_desc("log10(UMI counts)")
        .y_desc("% intronic reads")
        .draw()?;

    let bins = histogram2d(points.iter().copied(), ranges, GRID_X, GRID_Y);
    let max_count = bins.iter().flatten().copied().max().unwrap_or(0);
    if max_count == 0 {
        return Ok(());
    }

    let x_step = (ranges.x_max - ranges.x_min) / GRID_X as f64;
    let y_step = (ranges.y_max - ranges.y_min) / GRID_Y as f64;
    let log_max = (1.0 + max_count as f64).ln();

    chart.draw_series(bins.iter().enumerate().flat_map(|(ix, column)| {
        let x0 = ranges.x_min + ix as f64 * x_step;
        column
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(move |(iy, &count)| {
                let y0 = ranges.y_min + iy as f64 * y_step;
                let shade = (1.0 + count as f64).ln() / log_max;
                Rectangle::new(
                    [(x0, y0), (x0 + x_step, y0 + y_step)],
                    blues(shade).filled(),
                )
            })
    }))?;
    Ok(())
}

fn draw_placeholder_panel(panel: &Panel<'_>, title: &str) -> DrawResult {
    let (width, height) = panel.dim_in_pixel();
    let centered = TextStyle::from(("sans-serif", 22).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));

    panel.draw(&Text::new(
        title.to_string(),
        (width as i32 / 2, 30),
        centered.clone(),
    ))?;
    panel.draw(&Text::new(
        "No data available".to_string(),
        (width as i32 / 2, height as i32 / 2),
        centered.color(&RGBColor(110, 110, 110)),
    ))?;
    Ok(())
}

/// Light-to-dark blue ramp over `[0, 1]`.
fn blues(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(lerp(222, 8), lerp(235, 48), lerp(247, 107))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::{CooMatrix, CsrMatrix};

    fn dataset_with_qc(umi: Option<Vec<f64>>, pct: Option<Vec<f64>>) -> CountsDataset {
        let n = 4;
        let mut coo = CooMatrix::new(n, 2);
        coo.push(0, 0, 1);
        coo.push(3, 1, 2);
        CountsDataset {
            matrix: CsrMatrix::from(&coo),
            barcodes: (0..n).map(|i| format!("BC{i}")).collect(),
            gene_names: vec!["ACTB".to_string(), "GAPDH".to_string()],
            gene_ids: vec!["ENSG1".to_string(), "ENSG2".to_string()],
            feature_types: vec!["Gene Expression".to_string(); 2],
            genomes: vec!["GRCh38".to_string(); 2],
            umi_counts: umi,
            pct_intronic: pct,
        }
    }

    #[test]
    fn ranges_come_from_the_full_population() {
        let umi = vec![10.0, 100.0, 1000.0, 10000.0];
        let pct = vec![5.0, 20.0, 35.0, 50.0];
        let ranges = axis_ranges(&umi, &pct).unwrap();
        assert!((ranges.x_min - 1.0).abs() < 1e-12);
        assert!((ranges.x_max - 4.0).abs() < 1e-12);
        assert_eq!(ranges.y_min, 5.0);
        assert_eq!(ranges.y_max, 50.0);
    }

    #[test]
    fn non_positive_umi_counts_are_excluded_from_ranges() {
        let umi = vec![0.0, -5.0, 100.0];
        let pct = vec![1.0, 2.0, 3.0];
        let ranges = axis_ranges(&umi, &pct).unwrap();
        assert!((ranges.x_min - 2.0).abs() < 1e-12);
        assert_eq!(ranges.y_min, 3.0);
    }

    #[test]
    fn unplottable_population_yields_no_ranges() {
        assert_eq!(axis_ranges(&[0.0, 0.0], &[1.0, 2.0]), None);
        assert_eq!(axis_ranges(&[], &[]), None);
    }

    #[test]
    fn degenerate_spans_are_padded() {
        let ranges = axis_ranges(&[100.0, 100.0], &[7.0, 7.0]).unwrap();
        assert!(ranges.x_max > ranges.x_min);
        assert!(ranges.y_max > ranges.y_min);
    }

    #[test]
    fn histogram_counts_land_in_their_bins() {
        let ranges = AxisRanges {
            x_min: 0.0,
            x_max: 10.0,
            y_min: 0.0,
            y_max: 10.0,
        };
        let points = vec![(0.5, 0.5), (0.5, 0.5), (9.9, 9.9), (10.0, 10.0)];
        let bins = histogram2d(points, ranges, 10, 10);
        assert_eq!(bins[0][0], 2);
        // values on the top edge clamp into the last bin
        assert_eq!(bins[9][9], 2);
        let total: u32 = bins.iter().flatten().sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn out_of_range_points_are_dropped() {
        let ranges = AxisRanges {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        };
        let bins = histogram2d(vec![(-0.1, 0.5), (0.5, 2.0)], ranges, 4, 4);
        let total: u32 = bins.iter().flatten().sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn renders_density_panels_when_qc_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.svg");
        let dataset = dataset_with_qc(
            Some(vec![10.0, 100.0, 1000.0, 10000.0]),
            Some(vec![5.0, 20.0, 35.0, 50.0]),
        );
        let selection = Selection::from_indices(vec![1, 2]);

        render_summary(&dataset, &selection, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("All barcodes"));
        assert!(svg.contains("Selected barcodes"));
        assert!(!svg.contains("No data available"));
    }

    #[test]
    fn renders_placeholders_when_qc_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.svg");
        let dataset = dataset_with_qc(None, None);
        let selection = Selection::from_indices(vec![0]);

        render_summary(&dataset, &selection, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("No data available"));
    }

    #[test]
    fn one_missing_qc_field_still_renders_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.svg");
        let dataset = dataset_with_qc(Some(vec![10.0, 20.0, 30.0, 40.0]), None);
        let selection = Selection::from_indices(vec![0]);

        render_summary(&dataset, &selection, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("No data available"));
    }
}
