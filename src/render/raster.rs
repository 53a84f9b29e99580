use crate::color::Colormap;
use crate::color::Rgb;
use crate::grid::GridBuffer;
use crate::render::font;
use crate::render::layout::Layout;
use crate::render::layout::Rect;

/// An RGB8 framebuffer, row major.
pub struct Canvas {
    /// Three bytes per pixel
    px: Vec<u8>,

    /// Width in pixels
    w: usize,

    /// Height in pixels
    h: usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize, background: Rgb) -> Self {
        let mut canvas = Self {
            px: vec![0; 3 * w * h],
            w,
            h,
        };
        canvas.clear(background);

        canvas
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    /// Raw `rgb24` bytes
    pub fn bytes(&self) -> &[u8] {
        &self.px
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.w || y >= self.h {
            return None;
        }

        let i = self.xy_from(x, y);

        Some([self.px[i], self.px[i + 1], self.px[i + 2]])
    }

    pub fn clear(&mut self, color: Rgb) {
        let c = color.to_bytes();

        for px in self.px.chunks_exact_mut(3) {
            px.copy_from_slice(&c);
        }
    }

    /// Sets a single pixel. Pixels off the canvas are dropped.
    pub fn draw_pixel(&mut self, x: usize, y: usize, c: [u8; 3]) {
        if x >= self.w || y >= self.h {
            return;
        }

        let i = self.xy_from(x, y);
        self.px[i..i + 3].copy_from_slice(&c);
    }

    /// Fills `rect`, clipped to the canvas
    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        let c = color.to_bytes();

        let x_end = (rect.x + rect.w).min(self.w);
        let y_end = (rect.y + rect.h).min(self.h);

        for y in rect.y..y_end {
            for x in rect.x..x_end {
                let i = self.xy_from(x, y);
                self.px[i..i + 3].copy_from_slice(&c);
            }
        }
    }

    /// One pixel wide outline just outside `rect`
    pub fn draw_outline(&mut self, rect: Rect, color: Rgb) {
        let c = color.to_bytes();

        let (x0, y0) = (rect.x.saturating_sub(1), rect.y.saturating_sub(1));
        let (x1, y1) = (rect.x + rect.w, rect.y + rect.h);

        for x in x0..=x1 {
            self.draw_pixel(x, y0, c);
            self.draw_pixel(x, y1, c);
        }

        for y in y0..=y1 {
            self.draw_pixel(x0, y, c);
            self.draw_pixel(x1, y, c);
        }
    }

    /// Draws `text` with its top-left corner at `(x, y)`, every font pixel `scale` pixels wide.
    pub fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: Rgb) {
        let step = (font::GLYPH_WIDTH + font::GLYPH_SPACING) * scale;

        for (n, ch) in text.chars().enumerate() {
            let glyph = font::glyph(ch);
            let gx = x + n * step;

            for fy in 0..font::GLYPH_HEIGHT {
                for fx in 0..font::GLYPH_WIDTH {
                    if !font::is_set(&glyph, fx, fy) {
                        continue;
                    }

                    let rect = Rect {
                        x: gx + fx * scale,
                        y: y + fy * scale,
                        w: scale,
                        h: scale,
                    };
                    self.fill_rect(rect, color);
                }
            }
        }
    }

    /// Draws the grid into `rect` with nearest neighbour sampling.
    pub fn draw_grid(&mut self, grid: &GridBuffer, rect: Rect) {
        if grid.width() == 0 || grid.height() == 0 {
            return;
        }

        let sample = |px: usize, span: usize, cells: usize| (px * cells / span).min(cells - 1);

        let cols: Vec<usize> = (0..rect.w)
            .map(|px| sample(px, rect.w, grid.width()))
            .collect();

        for py in 0..rect.h {
            let row = sample(py, rect.h, grid.height());

            for (px, &col) in cols.iter().enumerate() {
                let Some(color) = grid.get(col, row) else {
                    continue;
                };

                self.draw_pixel(rect.x + px, rect.y + py, color.to_bytes());
            }
        }
    }

    /// Draws lines of width `line` along the cell borders of a `cols` x `rows` grid drawn into
    /// `rect`. The outer border is left alone.
    pub fn draw_gridlines(&mut self, rect: Rect, cols: usize, rows: usize, line: usize, color: Rgb) {
        let half = line / 2;

        for i in 1..cols {
            let x = rect.x + i * rect.w / cols;
            let r = Rect {
                x: x.saturating_sub(half),
                y: rect.y,
                w: line,
                h: rect.h,
            };
            self.fill_rect(r, color);
        }

        for j in 1..rows {
            let y = rect.y + j * rect.h / rows;
            let r = Rect {
                x: rect.x,
                y: y.saturating_sub(half),
                w: rect.w,
                h: line,
            };
            self.fill_rect(r, color);
        }
    }

    /// A vertical gradient strip, the top of `rect` being the top of the colormap.
    pub fn draw_colorbar(&mut self, colormap: &Colormap, rect: Rect) {
        if rect.h == 0 {
            return;
        }

        let denom = rect.h.saturating_sub(1).max(1) as f32;

        for dy in 0..rect.h {
            let t = 1.0 - dy as f32 / denom;
            let row = Rect {
                x: rect.x,
                y: rect.y + dy,
                w: rect.w,
                h: 1,
            };

            self.fill_rect(row, colormap.sample(t));
        }
    }

    fn xy_from(&self, x: usize, y: usize) -> usize {
        3 * (y * self.w + x)
    }
}

/// Paints a whole frame: title, grid, gridlines and colorbar.
pub struct Painter {
    pub layout: Layout,
    pub background: Rgb,
    pub foreground: Rgb,
    pub gridlines: Option<Rgb>,
    pub colorbar: Option<Colormap>,
}

impl Painter {
    pub fn paint(&self, canvas: &mut Canvas, grid: &GridBuffer, title: &str) {
        let layout = &self.layout;

        canvas.clear(self.background);

        let (tx, ty) = layout.title_origin(title);
        canvas.draw_text(title, tx, ty, layout.text_scale, self.foreground);

        canvas.draw_grid(grid, layout.plot);

        if let (Some(color), Some(line)) = (self.gridlines, layout.gridline_width()) {
            canvas.draw_gridlines(layout.plot, grid.width(), grid.height(), line, color);
        }

        if let (Some(colormap), Some(rect)) = (&self.colorbar, layout.colorbar) {
            canvas.draw_colorbar(colormap, rect);
            canvas.draw_outline(rect, self.foreground);
        }
    }
}
