use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

use trimat_error::{TrimatResult, trimat_bail};

use crate::matrix::check_range;
use crate::{DenseMatrix, Labels};

/// A shared handle to one stored block.
pub type BlockRef = Arc<dyn BlockHandle>;

/// Read access to a rectangular matrix held by some storage backend.
///
/// Coordinates are 0-based. Handles are immutable once opened and must be safe to read from
/// several threads at once.
pub trait BlockHandle: 'static + Send + Sync + Debug {
    /// The number of rows.
    fn rows(&self) -> usize;

    /// The number of columns.
    fn cols(&self) -> usize;

    /// Row labels, if the block carries them.
    fn row_labels(&self) -> Option<&[String]>;

    /// Column labels, if the block carries them.
    fn col_labels(&self) -> Option<&[String]>;

    /// Read the cell at `(row, col)`.
    fn read_element(&self, row: usize, col: usize) -> TrimatResult<f64>;

    /// Read a batch of cells, in order.
    ///
    /// Backends that can amortize bounds checks or page faults across a batch should override
    /// this.
    fn read_elements(&self, coords: &[(usize, usize)]) -> TrimatResult<Vec<f64>> {
        coords
            .iter()
            .map(|&(row, col)| self.read_element(row, col))
            .collect()
    }

    /// Copy out the rectangle `rows x cols`, with the matching label ranges.
    fn read_submatrix(&self, rows: Range<usize>, cols: Range<usize>) -> TrimatResult<DenseMatrix> {
        check_range("row", &rows, self.rows())?;
        check_range("column", &cols, self.cols())?;

        let mut values = Vec::with_capacity(rows.len() * cols.len());
        for row in rows.clone() {
            for col in cols.clone() {
                values.push(self.read_element(row, col)?);
            }
        }
        let row_labels = self.row_labels().map(|l| Labels::from(&l[rows.clone()]));
        let col_labels = self.col_labels().map(|l| Labels::from(&l[cols.clone()]));
        DenseMatrix::try_new(rows.len(), cols.len(), values)?.with_axis_labels(row_labels, col_labels)
    }
}

/// Fail with [`OutOfBounds`](trimat_error::TrimatError::OutOfBounds) unless `(row, col)` lies
/// inside a `rows x cols` block.
#[inline]
pub fn check_cell(row: usize, col: usize, rows: usize, cols: usize) -> TrimatResult<()> {
    if row >= rows {
        trimat_bail!(OutOfBounds: row, 0, rows);
    }
    if col >= cols {
        trimat_bail!(OutOfBounds: col, 0, cols);
    }
    Ok(())
}

impl BlockHandle for DenseMatrix {
    fn rows(&self) -> usize {
        DenseMatrix::rows(self)
    }

    fn cols(&self) -> usize {
        DenseMatrix::cols(self)
    }

    fn row_labels(&self) -> Option<&[String]> {
        DenseMatrix::row_labels(self)
    }

    fn col_labels(&self) -> Option<&[String]> {
        DenseMatrix::col_labels(self)
    }

    fn read_element(&self, row: usize, col: usize) -> TrimatResult<f64> {
        check_cell(row, col, self.rows(), self.cols())?;
        Ok(self.value(row, col))
    }

    fn read_submatrix(&self, rows: Range<usize>, cols: Range<usize>) -> TrimatResult<DenseMatrix> {
        self.slice(rows, cols)
    }
}
