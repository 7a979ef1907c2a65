use std::fmt::Debug;

use trimat_error::{TrimatResult, trimat_bail};

/// The number of cells in the upper triangle (diagonal included) of a `side x side` grid.
#[inline]
pub const fn triangular_len(side: usize) -> usize {
    side * (side + 1) / 2
}

/// The side of the triangle holding exactly `len` cells, if `len` is a triangular number.
///
/// Solves `q * (q + 1) / 2 == len`, i.e. `q = (-1 + sqrt(1 + 8 * len)) / 2`, in integers.
pub fn triangular_side(len: usize) -> Option<usize> {
    let discriminant = len.checked_mul(8)?.checked_add(1)?;
    let side = (discriminant.isqrt() - 1) / 2;
    (triangular_len(side) == len).then_some(side)
}

/// The upper triangle of a square grid of cells, stored as one flat arena.
///
/// Coordinates are 0-based with `row <= col < side`. Cells are held in canonical order: row 0
/// from the diagonal rightwards, then row 1 from its diagonal, and so on.
#[derive(Clone, PartialEq, Eq)]
pub struct Triangle<T> {
    side: usize,
    cells: Vec<T>,
}

impl<T> Triangle<T> {
    /// Build a triangle from cells in canonical order.
    ///
    /// Fails with [`InvalidShape`](trimat_error::TrimatError::InvalidShape) unless the number of
    /// cells is a triangular number.
    pub fn try_from_flat(cells: Vec<T>) -> TrimatResult<Self> {
        let Some(side) = triangular_side(cells.len()) else {
            trimat_bail!(
                InvalidShape: "{} blocks do not form a triangle: expected q * (q + 1) / 2 blocks for some q",
                cells.len()
            );
        };
        Ok(Self { side, cells })
    }

    /// Build a triangle from nested rows, where row `r` holds `side - r` cells starting at the
    /// diagonal.
    pub fn from_rows(rows: Vec<Vec<T>>) -> TrimatResult<Self> {
        let side = rows.len();
        let mut cells = Vec::with_capacity(triangular_len(side));
        for (row, items) in rows.into_iter().enumerate() {
            if items.len() != side - row {
                trimat_bail!(
                    InvalidLayout: "block row {} holds {} blocks, expected {}",
                    row + 1,
                    items.len(),
                    side - row
                );
            }
            cells.extend(items);
        }
        Ok(Self { side, cells })
    }

    /// The number of rows (and columns) of the grid.
    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// The number of stored cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the triangle has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Position of `(row, col)` in the arena.
    #[inline]
    fn position(&self, row: usize, col: usize) -> usize {
        debug_assert!(row <= col && col < self.side);
        // rows before `row` hold side, side - 1, ..., side - row + 1 cells
        row * (2 * self.side + 1 - row) / 2 + (col - row)
    }

    /// The cell at `(row, col)`, or `None` if the coordinate is below the diagonal or outside
    /// the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        (row <= col && col < self.side).then(|| &self.cells[self.position(row, col)])
    }

    /// The cells of one row, from the diagonal rightwards.
    ///
    /// ## Panics
    ///
    /// Panics if `row` is not less than the side.
    pub fn row(&self, row: usize) -> &[T] {
        let start = self.position(row, row);
        &self.cells[start..start + self.side - row]
    }

    /// All cells in canonical order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// All cells with their coordinates, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> + '_ {
        (0..self.side)
            .flat_map(move |row| (row..self.side).map(move |col| (row, col)))
            .zip(self.cells.iter())
    }

    /// Apply `f` to every cell, keeping the shape.
    pub fn try_map<U, F>(&self, mut f: F) -> TrimatResult<Triangle<U>>
    where
        F: FnMut((usize, usize), &T) -> TrimatResult<U>,
    {
        Ok(Triangle {
            side: self.side,
            cells: self
                .iter()
                .map(|(coord, cell)| f(coord, cell))
                .collect::<TrimatResult<_>>()?,
        })
    }
}

impl<T: Debug> Debug for Triangle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
