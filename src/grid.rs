use thiserror::Error;

use crate::CellCoord;
use crate::color::Rgb;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cell ({x}, {y}) lies outside the {width}x{height} grid")]
pub struct OutOfBounds {
    pub x: CellCoord,
    pub y: CellCoord,
    pub width: usize,
    pub height: usize,
}

/// The colors of every cell of the simulated grid.
///
/// The buffer is never cleared: each frame only overwrites the cells it mentions, so a frame is
/// the overlay of every frame before it.
#[derive(Debug, Clone, PartialEq)]
pub struct GridBuffer {
    /// Row-major cell colors, `cells[row * width + col]`
    cells: Vec<Rgb>,

    /// Number of columns
    width: usize,

    /// Number of rows
    height: usize,

    /// World coordinate of the top-left cell
    origin: (CellCoord, CellCoord),
}

impl GridBuffer {
    /// Create a black grid of `width` columns and `height` rows
    pub fn new(width: usize, height: usize, origin: (CellCoord, CellCoord)) -> Self {
        Self {
            cells: vec![Rgb::BLACK; width * height],
            width,
            height,
            origin,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> (CellCoord, CellCoord) {
        self.origin
    }

    /// Color at column `col`, row `row` of the buffer.
    pub fn get(&self, col: usize, row: usize) -> Option<Rgb> {
        if col >= self.width || row >= self.height {
            return None;
        }

        Some(self.cells[self.xy_from(col, row)])
    }

    /// Color of the cell at world coordinates `(x, y)`.
    pub fn cell(&self, x: CellCoord, y: CellCoord) -> Result<Rgb, OutOfBounds> {
        let (col, row) = self.translate(x, y)?;

        Ok(self.cells[self.xy_from(col, row)])
    }

    /// Overwrite the cell at world coordinates `(x, y)`.
    pub fn set(&mut self, x: CellCoord, y: CellCoord, color: Rgb) -> Result<(), OutOfBounds> {
        let (col, row) = self.translate(x, y)?;
        let i = self.xy_from(col, row);

        self.cells[i] = color;

        Ok(())
    }

    /// Iterates over the rows of the buffer, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.cells.chunks_exact(self.width.max(1))
    }

    /// Moves world coordinates into buffer coordinates, rejecting anything outside the grid.
    fn translate(&self, x: CellCoord, y: CellCoord) -> Result<(usize, usize), OutOfBounds> {
        let out_of_bounds = || OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        };

        let col = x.checked_sub(self.origin.0).ok_or_else(out_of_bounds)?;
        let row = y.checked_sub(self.origin.1).ok_or_else(out_of_bounds)?;

        let col = usize::try_from(col).map_err(|_| out_of_bounds())?;
        let row = usize::try_from(row).map_err(|_| out_of_bounds())?;

        if col >= self.width || row >= self.height {
            return Err(out_of_bounds());
        }

        Ok((col, row))
    }

    fn xy_from(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }
}

#[cfg(test)]
mod test {
    use super::GridBuffer;
    use super::OutOfBounds;
    use crate::color::Rgb;

    #[test]
    fn starts_black() {
        let grid = GridBuffer::new(3, 2, (0, 0));

        assert!(grid.rows().flatten().all(|&c| c == Rgb::BLACK));
        assert_eq!(grid.rows().count(), 2);
    }

    #[test]
    fn set_translates_origin() {
        let mut grid = GridBuffer::new(4, 4, (10, -2));
        grid.set(11, 0, Rgb::RED).unwrap();

        assert_eq!(grid.get(1, 2), Some(Rgb::RED));
        assert_eq!(grid.cell(11, 0), Ok(Rgb::RED));
    }

    #[test]
    fn rejects_out_of_bounds() {
        let mut grid = GridBuffer::new(20, 20, (0, 0));

        let err = grid.set(20, 3, Rgb::WHITE).unwrap_err();
        assert_eq!(
            err,
            OutOfBounds {
                x: 20,
                y: 3,
                width: 20,
                height: 20
            }
        );

        assert!(grid.set(-1, 0, Rgb::WHITE).is_err());
        assert!(grid.set(0, 20, Rgb::WHITE).is_err());
        assert!(grid.set(i64::MIN, 0, Rgb::WHITE).is_err());

        // Nothing was written
        assert!(grid.rows().flatten().all(|&c| c == Rgb::BLACK));
    }

    #[test]
    fn origin_below_grid_is_rejected() {
        let mut grid = GridBuffer::new(5, 5, (3, 3));

        assert!(grid.set(2, 3, Rgb::WHITE).is_err());
        assert!(grid.set(7, 7, Rgb::WHITE).is_ok());
        assert!(grid.set(8, 7, Rgb::WHITE).is_err());
    }
}
