//! Animated particle raster.
//!
//! The verse is a `size×size` grid of cells, each `scale` pixels wide. Every
//! frame draws one disc per particle at the cell of its dominant state, plus
//! a blue progress bar along the bottom edge.

#[cfg(feature = "plotters")]
use plotters::coord::Shift;
#[cfg(feature = "plotters")]
use plotters::prelude::*;

use crate::error::Result;
#[cfg(feature = "plotters")]
use crate::error::VerseError;
use crate::training::Dominant;
use std::path::Path;

/// Height of the progress bar in pixels.
pub const PROGRESS_BAR_HEIGHT: u32 = 10;

/// Everything needed to draw one frame, independent of the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// `(column, row)` grid cell per particle.
    pub cells: Vec<(usize, usize)>,
    /// Progress bar length in pixels.
    pub progress: u32,
}

impl Frame {
    pub fn layout(dominants: &[Dominant], size: usize, iteration: usize, iterations: usize, extent: u32) -> Self {
        let cells = dominants
            .iter()
            .filter(|d| d.index < size * size)
            .map(|d| (d.index % size, d.index / size))
            .collect();
        let progress = if iterations == 0 {
            0
        } else {
            (iteration as f64 * extent as f64 / iterations as f64) as u32
        };
        Self { cells, progress }
    }
}

/// Corners of the progress bar; rasters shorter than the bar are covered
/// entirely.
#[cfg_attr(not(feature = "plotters"), allow(dead_code))]
pub(crate) fn progress_bar(extent: u32, progress: u32) -> [(i32, i32); 2] {
    let top = extent.saturating_sub(PROGRESS_BAR_HEIGHT);
    [(0, top as i32), (progress.min(extent) as i32, extent as i32)]
}

/// GIF sink fed one [`Frame`] per training iteration.
#[cfg(feature = "plotters")]
pub struct ParticleRaster<'a> {
    area: DrawingArea<BitMapBackend<'a>, Shift>,
    scale: u32,
    extent: u32,
}

#[cfg(feature = "plotters")]
impl<'a> ParticleRaster<'a> {
    /// `delay_ms` is the per-frame delay of the animation.
    pub fn create(path: &'a Path, size: usize, scale: usize, delay_ms: u32) -> Result<Self> {
        let extent = (size * scale) as u32;
        let backend = BitMapBackend::gif(path, (extent, extent), delay_ms)
            .map_err(|e| VerseError::Render(e.to_string()))?;
        Ok(Self {
            area: backend.into_drawing_area(),
            scale: scale as u32,
            extent,
        })
    }

    pub fn push(&mut self, frame: &Frame) -> Result<()> {
        self.draw(frame).map_err(|e| VerseError::Render(e.to_string()))
    }

    fn draw(&mut self, frame: &Frame) -> std::result::Result<(), Box<dyn std::error::Error>> {
        self.area.fill(&BLACK)?;
        let radius = self.scale / 2;
        for &(x, y) in &frame.cells {
            let center = (
                (x as u32 * self.scale + radius) as i32,
                (y as u32 * self.scale + radius) as i32,
            );
            self.area.draw(&Circle::new(center, radius, WHITE.filled()))?;
        }
        if frame.progress > 0 {
            self.area.draw(&Rectangle::new(
                progress_bar(self.extent, frame.progress),
                BLUE.filled(),
            ))?;
        }
        self.area.present()?;
        Ok(())
    }
}

#[cfg(not(feature = "plotters"))]
pub struct ParticleRaster<'a> {
    _path: std::marker::PhantomData<&'a Path>,
}

#[cfg(not(feature = "plotters"))]
impl<'a> ParticleRaster<'a> {
    pub fn create(_path: &'a Path, _size: usize, _scale: usize, _delay_ms: u32) -> Result<Self> {
        log::warn!("particle animation requires --features plotters");
        Ok(Self {
            _path: std::marker::PhantomData,
        })
    }

    pub fn push(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(index: usize) -> Dominant {
        Dominant {
            index,
            magnitude: 1.0,
        }
    }

    #[test]
    fn test_layout_maps_index_to_cell() {
        let frame = Frame::layout(&[at(0), at(5), at(31), at(32 * 3 + 7)], 32, 0, 10, 800);
        assert_eq!(frame.cells, vec![(0, 0), (5, 0), (31, 0), (7, 3)]);
        assert_eq!(frame.progress, 0);
    }

    #[test]
    fn test_layout_progress_bar() {
        let frame = Frame::layout(&[], 32, 512, 2048, 800);
        assert_eq!(frame.progress, 200);
    }

    #[test]
    fn test_progress_bar_fits_tiny_raster() {
        assert_eq!(progress_bar(800, 200), [(0, 790), (200, 800)]);
        assert_eq!(progress_bar(8, 4), [(0, 0), (4, 8)]);
        assert_eq!(progress_bar(8, 20), [(0, 0), (8, 8)]);
    }

    #[cfg(feature = "plotters")]
    #[test]
    fn test_push_onto_raster_smaller_than_bar() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tiny.gif");
        let mut raster = ParticleRaster::create(&path, 2, 4, 100).unwrap();
        raster.push(&Frame::layout(&[at(3)], 2, 1, 2, 8)).unwrap();
        drop(raster);
        assert!(path.exists());
    }

    #[test]
    fn test_layout_skips_out_of_grid() {
        let frame = Frame::layout(&[at(16)], 4, 1, 0, 100);
        assert!(frame.cells.is_empty());
        assert_eq!(frame.progress, 0);
    }
}
