//! Stream multiplexer: grid composition of per-region views.

use image::{imageops, RgbImage};

/// Composes per-region annotated crops into a uniform grid.
///
/// Cells are padded to the maximum width/height observed over the life of
/// the composer; the maximum accumulates and never shrinks, so the grid
/// geometry stays stable for downstream viewers even when a large region is
/// removed. A short trailing row is padded with blank filler cells.
#[derive(Debug)]
pub struct GridComposer {
    columns: u32,
    max_width: u32,
    max_height: u32,
}

impl GridComposer {
    pub fn new(columns: u32) -> Self {
        Self {
            columns: columns.max(1),
            max_width: 0,
            max_height: 0,
        }
    }

    /// Compose one combined view.
    ///
    /// Returns `None` for zero input cells: the stream yields nothing for
    /// that cycle rather than a blank frame.
    pub fn compose(&mut self, cells: &[RgbImage]) -> Option<RgbImage> {
        if cells.is_empty() {
            return None;
        }

        for cell in cells {
            self.max_width = self.max_width.max(cell.width());
            self.max_height = self.max_height.max(cell.height());
        }

        let rows = (cells.len() as u32).div_ceil(self.columns);
        let mut grid = RgbImage::new(self.columns * self.max_width, rows * self.max_height);
        for (i, cell) in cells.iter().enumerate() {
            let col = i as u32 % self.columns;
            let row = i as u32 / self.columns;
            imageops::replace(
                &mut grid,
                cell,
                (col * self.max_width) as i64,
                (row * self.max_height) as i64,
            );
        }
        Some(grid)
    }

    /// Current accumulated cell size.
    pub fn cell_size(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn test_zero_cells_yield_nothing() {
        let mut composer = GridComposer::new(2);
        assert!(composer.compose(&[]).is_none());
    }

    #[test]
    fn test_single_cell_row_is_padded_to_full_width() {
        let mut composer = GridComposer::new(2);
        let grid = composer.compose(&[solid(10, 8, 200)]).unwrap();
        assert_eq!(grid.dimensions(), (20, 8));
        assert_eq!(grid.get_pixel(0, 0), &Rgb([200, 200, 200]));
        assert_eq!(grid.get_pixel(10, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_trailing_row_is_padded_with_blank_cells() {
        let mut composer = GridComposer::new(2);
        let cells = [solid(10, 8, 100), solid(10, 8, 150), solid(10, 8, 200)];
        let grid = composer.compose(&cells).unwrap();

        // Two full columns, two rows; the fourth slot is blank filler.
        assert_eq!(grid.dimensions(), (20, 16));
        assert_eq!(grid.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(grid.get_pixel(10, 0), &Rgb([150, 150, 150]));
        assert_eq!(grid.get_pixel(0, 8), &Rgb([200, 200, 200]));
        assert_eq!(grid.get_pixel(10, 8), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_cells_are_padded_to_the_largest_input() {
        let mut composer = GridComposer::new(2);
        let cells = [solid(10, 8, 100), solid(20, 16, 150)];
        let grid = composer.compose(&cells).unwrap();

        assert_eq!(grid.dimensions(), (40, 16));
        // The small cell sits at its slot origin with blank padding below.
        assert_eq!(grid.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(grid.get_pixel(0, 15), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_cell_size_never_shrinks() {
        let mut composer = GridComposer::new(2);
        composer.compose(&[solid(30, 20, 100)]).unwrap();
        assert_eq!(composer.cell_size(), (30, 20));

        // A later cycle with only a small cell keeps the accumulated size.
        let grid = composer.compose(&[solid(10, 8, 150)]).unwrap();
        assert_eq!(composer.cell_size(), (30, 20));
        assert_eq!(grid.dimensions(), (60, 20));
    }
}
