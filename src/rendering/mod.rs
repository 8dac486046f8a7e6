//! Output rendering: charts, particle animations and terminal summaries.

mod plots;
mod progress;
mod raster;

pub use plots::{CHART_SIZE, Point, SeriesPair, histogram, scatter, scatter_pair};
pub use progress::RunProgress;
pub use raster::{Frame, PROGRESS_BAR_HEIGHT, ParticleRaster};
