use crate::render::font;

/// An axis aligned rectangle of pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Gridlines are only drawn once cells are at least this many pixels wide
const MIN_GRIDLINE_CELL: f64 = 4.0;

/// Where everything goes on an output frame.
///
/// ```text
/// +--------------------------------+
/// |        Time 00:00:01.500       |
/// |   +----------------+  +--+     |
/// |   |                |  |  |     |
/// |   |      plot      |  |cb|     |
/// |   |                |  |  |     |
/// |   +----------------+  +--+     |
/// +--------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Frame width in pixels, always even
    pub width: usize,

    /// Frame height in pixels, always even
    pub height: usize,

    /// Size of a font pixel
    pub text_scale: usize,

    /// Outer margin, and the gap between plot and colorbar
    pub margin: usize,

    /// Where the grid is drawn
    pub plot: Rect,

    /// Pixels per cell
    pub scale: f64,

    pub colorbar: Option<Rect>,

    /// Grid dimensions, in cells
    cells: (usize, usize),
}

impl Layout {
    /// Lays out a `figure` (width, height in inches) rendered at `dpi` for a grid of `cols` x
    /// `rows` cells.
    pub fn new(figure: (f64, f64), dpi: u32, cols: usize, rows: usize, colorbar: bool) -> Self {
        // yuv420 encoders need even dimensions
        let even = |n: f64| {
            let n = if n.is_finite() { n.round().max(16.0) as usize } else { 16 };
            n + n % 2
        };

        let width = even(figure.0 * dpi as f64);
        let height = even(figure.1 * dpi as f64);

        let cols = cols.max(1);
        let rows = rows.max(1);

        let text_scale = (dpi as usize / 50).max(1);
        let margin = (height / 24).max(2);
        let title_h = font::GLYPH_HEIGHT * text_scale + 2 * margin;

        let colorbar_w = if colorbar { (width / 32).max(4) } else { 0 };
        let reserved_w = 2 * margin + if colorbar { colorbar_w + margin } else { 0 };

        let avail_w = width.saturating_sub(reserved_w).max(1);
        let avail_h = height.saturating_sub(title_h + margin).max(1);

        let scale = (avail_w as f64 / cols as f64).min(avail_h as f64 / rows as f64);

        let plot_w = ((cols as f64 * scale).floor() as usize).clamp(1, avail_w);
        let plot_h = ((rows as f64 * scale).floor() as usize).clamp(1, avail_h);

        let plot = Rect {
            x: margin + (avail_w - plot_w) / 2,
            y: title_h + (avail_h - plot_h) / 2,
            w: plot_w,
            h: plot_h,
        };

        let colorbar = colorbar.then(|| Rect {
            x: plot.x + plot.w + margin,
            y: plot.y,
            w: colorbar_w,
            h: plot.h,
        });

        Self {
            width,
            height,
            text_scale,
            margin,
            plot,
            scale,
            colorbar,
            cells: (cols, rows),
        }
    }

    /// Top-left corner of the title, centered horizontally in the band above the plot
    pub fn title_origin(&self, title: &str) -> (usize, usize) {
        let w = font::text_width(title) * self.text_scale;

        (self.width.saturating_sub(w) / 2, self.margin)
    }

    /// Width of the gridlines, or `None` if cells are too small to separate
    pub fn gridline_width(&self) -> Option<usize> {
        if self.scale < MIN_GRIDLINE_CELL {
            return None;
        }

        Some(((self.scale / 12.0).round() as usize).max(1))
    }

    /// The output pixel at the center of the cell in column `col`, row `row`
    pub fn cell_pixel(&self, col: usize, row: usize) -> Option<(usize, usize)> {
        let (cols, rows) = self.cells;
        if col >= cols || row >= rows {
            return None;
        }

        // inverse of the nearest neighbour sampling in `Canvas::draw_grid`
        let center = |i: usize, span: usize, cells: usize| (2 * i + 1) * span / (2 * cells);

        Some((
            self.plot.x + center(col, self.plot.w, cols),
            self.plot.y + center(row, self.plot.h, rows),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::Layout;

    #[test]
    fn figure_size_times_dpi() {
        let layout = Layout::new((6.4, 4.8), 300, 1000, 1000, true);

        assert_eq!((layout.width, layout.height), (1920, 1440));
        assert!(layout.colorbar.is_some());
    }

    #[test]
    fn dimensions_are_even() {
        let layout = Layout::new((6.4, 4.8), 77, 20, 20, false);

        assert_eq!(layout.width % 2, 0);
        assert_eq!(layout.height % 2, 0);
    }

    #[test]
    fn plot_fits_inside_frame() {
        for (cols, rows) in [(1, 1), (20, 20), (1000, 1000), (300, 10), (10, 300), (5000, 1)] {
            for colorbar in [false, true] {
                let layout = Layout::new((6.4, 4.8), 100, cols, rows, colorbar);
                let plot = layout.plot;

                assert!(plot.x + plot.w <= layout.width, "{cols}x{rows}");
                assert!(plot.y + plot.h <= layout.height, "{cols}x{rows}");

                if let Some(cb) = layout.colorbar {
                    assert!(cb.x + cb.w <= layout.width, "{cols}x{rows}");
                }
            }
        }
    }

    #[test]
    fn square_grid_keeps_aspect() {
        let layout = Layout::new((6.4, 4.8), 150, 20, 20, false);

        assert_eq!(layout.plot.w, layout.plot.h);
        assert!(layout.gridline_width().is_some());
    }

    #[test]
    fn tiny_cells_have_no_gridlines() {
        let layout = Layout::new((6.4, 4.8), 100, 1000, 1000, false);

        assert!(layout.scale < 1.0);
        assert_eq!(layout.gridline_width(), None);
    }

    #[test]
    fn cell_pixels() {
        let layout = Layout::new((6.4, 4.8), 100, 2, 2, false);
        let (x, y) = layout.cell_pixel(0, 0).unwrap();

        assert!(x >= layout.plot.x && x < layout.plot.x + layout.plot.w / 2);
        assert!(y >= layout.plot.y && y < layout.plot.y + layout.plot.h / 2);
        assert_eq!(layout.cell_pixel(2, 0), None);
    }
}
