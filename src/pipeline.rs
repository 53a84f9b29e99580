use std::path::Path;

use tracing::info;

use crate::Error;
use crate::config::Config;
use crate::decode::Decoder;
use crate::grid::GridBuffer;
use crate::log::EventLog;
use crate::log::LogReader;
use crate::render::Renderer;
use crate::render::encoder::FfmpegSink;
use crate::render::encoder::FrameSink;
use crate::render::layout::Layout;
use crate::render::progress::ProgressBar;
use crate::render::raster::Painter;

/// Builds the painter for `config`, sized for its grid.
pub fn painter(config: &Config) -> Painter {
    let render = &config.render;
    let layout = Layout::new(
        config.figure_size,
        config.dpi,
        config.grid.width,
        config.grid.height,
        render.colorbar,
    );

    Painter {
        layout,
        background: render.background,
        foreground: render.foreground,
        gridlines: render.gridlines.then_some(render.gridline_color),
        colorbar: render.colorbar.then(|| render.colormap.clone()),
    }
}

/// Renders every frame of `log` into `sink`. Returns the grid after the last frame.
pub fn render_log<S: FrameSink>(
    config: &Config,
    log: &EventLog,
    sink: S,
    progress: Option<ProgressBar>,
) -> Result<(GridBuffer, S), Error> {
    config.validate()?;

    let mut decoder = Decoder::prepare(&config.decode, log)?;
    let grid = GridBuffer::new(config.grid.width, config.grid.height, config.grid.origin);

    let mut renderer = Renderer::new(painter(config), sink);
    if let Some(progress) = progress {
        renderer = renderer.with_progress(progress);
    }

    info!(frames = log.frame_count(), "Initializing animation");

    let grid = renderer.render(grid, log.frame_count(), |index, grid| {
        let Some(frame) = log.frame(index) else {
            unreachable!("frame {index} is below the frame count")
        };

        decoder.apply_frame(&frame, grid)?;

        Ok(frame.time)
    })?;

    Ok((grid, renderer.into_sink()))
}

/// Reads the log at `path` and writes the video `config` describes.
pub fn run(config: &Config, path: &Path, show_progress: bool) -> Result<(), Error> {
    config.validate()?;

    let log = LogReader::new(config.delimiter()?).read_path(path)?;

    info!(
        path = %path.display(),
        rows = log.rows().len(),
        frames = log.frame_count(),
        port_rows = log.port_rows(),
        "Loaded log"
    );

    let sink = FfmpegSink::new(config.ffmpeg_program(), &config.output, config.interval_ms);
    let progress = show_progress.then(|| ProgressBar::stdout(log.frame_count()));

    info!(output = %config.output.display(), "Saving animation");
    render_log(config, &log, sink, progress)?;

    Ok(())
}
