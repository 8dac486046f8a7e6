//! PNG charts of training runs.
//!
//! Rendering goes through plotters (default `plotters` feature). Without it
//! every chart is skipped with a warning so headless builds still train.

#[cfg(feature = "plotters")]
use plotters::prelude::*;

use crate::error::{Result, VerseError};
use std::path::Path;

pub type Point = (f64, f64);

/// Chart size in pixels (8in at 100dpi).
pub const CHART_SIZE: (u32, u32) = (800, 800);

/// Two series of one chart, drawn in red and blue.
pub struct SeriesPair<'a> {
    pub first: &'a [Point],
    pub second: &'a [Point],
}

/// Finite points only; log-scaled determinants of singular matrices and
/// diverged costs would otherwise break the axis ranges.
fn finite(points: &[Point]) -> Vec<Point> {
    points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect()
}

/// Padded `(min, max)` of a set of values; never an empty range.
pub(crate) fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-9);
    (lo - pad, hi + pad)
}

/// Fixed-width bins over `[min, max]` of `values`: `(lower edge, width, count)`.
pub(crate) fn bin(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = ((hi - lo) / bins as f64).max(1e-12);
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + i as f64 * width, width, c))
        .collect()
}

fn render_error(e: Box<dyn std::error::Error>) -> VerseError {
    VerseError::Render(e.to_string())
}

/// Scatter plot of `points`, e.g. epochs vs cost.
pub fn scatter(points: &[Point], title: &str, x_label: &str, y_label: &str, path: &Path) -> Result<()> {
    draw_scatter(&finite(points), title, x_label, y_label, path).map_err(render_error)
}

/// Two scatter series on shared axes (red, then blue).
pub fn scatter_pair(series: SeriesPair<'_>, title: &str, x_label: &str, y_label: &str, path: &Path) -> Result<()> {
    let first = finite(series.first);
    let second = finite(series.second);
    draw_pair(&first, &second, title, x_label, y_label, path).map_err(render_error)
}

/// Histogram of `values` with `bins` equal-width bins.
pub fn histogram(values: &[f64], bins: usize, title: &str, path: &Path) -> Result<()> {
    draw_histogram(&bin(values, bins), title, path).map_err(render_error)
}

#[cfg(feature = "plotters")]
fn draw_scatter(
    points: &[Point],
    title: &str,
    x_label: &str,
    y_label: &str,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    draw_pair(points, &[], title, x_label, y_label, path)
}

#[cfg(feature = "plotters")]
fn draw_pair(
    first: &[Point],
    second: &[Point],
    title: &str,
    x_label: &str,
    y_label: &str,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let all = || first.iter().chain(second.iter());
    let (x0, x1) = bounds(all().map(|p| p.0));
    let (y0, y1) = bounds(all().map(|p| p.1));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart.configure_mesh().x_desc(x_label).y_desc(y_label).draw()?;

    // A single series keeps the plain black glyphs.
    let first_color = if second.is_empty() { BLACK } else { RED };
    chart.draw_series(first.iter().map(|&(x, y)| Circle::new((x, y), 1, first_color.filled())))?;
    if !second.is_empty() {
        chart.draw_series(second.iter().map(|&(x, y)| Circle::new((x, y), 1, BLUE.filled())))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(feature = "plotters")]
fn draw_histogram(
    bins: &[(f64, f64, usize)],
    title: &str,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x0, x1) = bounds(bins.iter().flat_map(|&(lo, w, _)| [lo, lo + w]));
    let max_count = bins.iter().map(|b| b.2).max().unwrap_or(0).max(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x0..x1, 0.0..max_count * 1.05)?;

    chart.configure_mesh().draw()?;

    chart.draw_series(bins.iter().map(|&(lo, w, count)| {
        Rectangle::new([(lo, 0.0), (lo + w, count as f64)], BLUE.mix(0.7).filled())
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(not(feature = "plotters"))]
fn draw_scatter(
    _points: &[Point],
    title: &str,
    _x_label: &str,
    _y_label: &str,
    _path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    log::warn!("plotting '{}' requires --features plotters", title);
    Ok(())
}

#[cfg(not(feature = "plotters"))]
fn draw_pair(
    _first: &[Point],
    _second: &[Point],
    title: &str,
    _x_label: &str,
    _y_label: &str,
    _path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    log::warn!("plotting '{}' requires --features plotters", title);
    Ok(())
}

#[cfg(not(feature = "plotters"))]
fn draw_histogram(
    _bins: &[(f64, f64, usize)],
    title: &str,
    _path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    log::warn!("plotting '{}' requires --features plotters", title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_pads_flat_series() {
        let (lo, hi) = bounds([2.0, 2.0, 2.0].into_iter());
        assert!(lo < 2.0 && hi > 2.0);
    }

    #[test]
    fn test_bounds_of_nothing() {
        assert_eq!(bounds(std::iter::empty()), (0.0, 1.0));
    }

    #[test]
    fn test_finite_drops_infinities() {
        let pts = [(0.0, 1.0), (1.0, f64::NEG_INFINITY), (2.0, f64::NAN)];
        assert_eq!(finite(&pts), vec![(0.0, 1.0)]);
    }

    #[test]
    fn test_bin_counts_everything() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let bins = bin(&values, 8);
        assert_eq!(bins.len(), 8);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 100);
        // The maximum lands in the last bin rather than overflowing.
        assert!(bins[7].2 > 0);
    }

    #[test]
    fn test_bin_empty() {
        assert!(bin(&[], 4).is_empty());
        assert!(bin(&[1.0], 0).is_empty());
    }
}
