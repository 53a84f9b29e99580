//! Turns the evolving grid buffer into video frames.

pub mod encoder;
pub mod font;
pub mod layout;
pub mod progress;
pub mod raster;
pub mod time_label;

use tracing::debug;
use tracing::warn;

use crate::Error;
use crate::grid::GridBuffer;
use crate::render::encoder::FrameSink;
use crate::render::progress::ProgressBar;
use crate::render::raster::Canvas;
use crate::render::raster::Painter;

/// Drives the frame loop: update the grid, paint it, hand it to the sink.
pub struct Renderer<S> {
    painter: Painter,
    sink: S,
    progress: Option<ProgressBar>,
}

impl<S: FrameSink> Renderer<S> {
    pub fn new(painter: Painter, sink: S) -> Self {
        Self {
            painter,
            sink,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Renders `frame_count` frames.
    ///
    /// For every frame, `update` receives the frame index and the grid, mutates the grid and
    /// returns the simulation time of the frame. The grid is painted as it stands after the
    /// update, so frames accumulate. Returns the grid as it stands after the last frame.
    ///
    /// The first error, whether from `update` or from the sink, aborts the render and the sink
    /// discards what it was given.
    pub fn render<F>(
        &mut self,
        mut grid: GridBuffer,
        frame_count: usize,
        update: F,
    ) -> Result<GridBuffer, Error>
    where
        F: FnMut(usize, &mut GridBuffer) -> Result<f64, Error>,
    {
        let result = self
            .render_frames(&mut grid, frame_count, update)
            .and_then(|()| self.sink.finish().map_err(Error::from));

        if let Err(e) = &result {
            warn!("Render failed, discarding output: {e}");
            self.sink.abort();
        }

        result.map(|()| grid)
    }

    fn render_frames<F>(
        &mut self,
        grid: &mut GridBuffer,
        frame_count: usize,
        mut update: F,
    ) -> Result<(), Error>
    where
        F: FnMut(usize, &mut GridBuffer) -> Result<f64, Error>,
    {
        let layout = &self.painter.layout;
        let mut canvas = Canvas::new(layout.width, layout.height, self.painter.background);

        for index in 0..frame_count {
            let time = update(index, grid)?;
            let title = time_label::title(time);

            self.painter.paint(&mut canvas, grid, &title);
            self.sink.write_frame(&canvas)?;

            debug!(frame = index, time, "Rendered frame");

            let failed = match &mut self.progress {
                Some(progress) => progress.update(index + 1).err(),
                None => None,
            };

            if let Some(e) = failed {
                warn!("Failed to draw progress, disabling it: {e}");
                self.progress = None;
            }
        }

        Ok(())
    }
}
