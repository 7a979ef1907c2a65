use std::fmt::{Debug, Formatter};
use std::ops::Range;

use bytes::Bytes;
use trimat_array::{BlockHandle, DenseMatrix, Labels, check_cell, check_range};
use trimat_error::TrimatResult;

use crate::EntrySpec;

const F64_SIZE: usize = size_of::<f64>();

/// A block whose cells are decoded on demand from the bytes of a block file.
///
/// When the file was memory-mapped the bytes borrow the mapping, so reading a cell touches only
/// the page that holds it.
#[derive(Clone)]
pub struct MmapBlock {
    data: Bytes,
    rows: usize,
    cols: usize,
    row_labels: Option<Labels>,
    col_labels: Option<Labels>,
}

impl MmapBlock {
    /// The entry must already be validated against `data`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn new(data: Bytes, entry: &EntrySpec) -> Self {
        Self {
            data,
            rows: entry.rows as usize,
            cols: entry.cols as usize,
            row_labels: entry.row_labels.as_deref().map(Labels::from),
            col_labels: entry.col_labels.as_deref().map(Labels::from),
        }
    }

    #[inline]
    fn cell(&self, row: usize, col: usize) -> f64 {
        let start = (row * self.cols + col) * F64_SIZE;
        let mut raw = [0u8; F64_SIZE];
        raw.copy_from_slice(&self.data[start..start + F64_SIZE]);
        f64::from_le_bytes(raw)
    }

    /// Decode the whole block into memory.
    pub fn to_dense(&self) -> TrimatResult<DenseMatrix> {
        self.read_submatrix(0..self.rows, 0..self.cols)
    }
}

impl BlockHandle for MmapBlock {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn row_labels(&self) -> Option<&[String]> {
        self.row_labels.as_deref()
    }

    fn col_labels(&self) -> Option<&[String]> {
        self.col_labels.as_deref()
    }

    fn read_element(&self, row: usize, col: usize) -> TrimatResult<f64> {
        check_cell(row, col, self.rows, self.cols)?;
        Ok(self.cell(row, col))
    }

    fn read_elements(&self, coords: &[(usize, usize)]) -> TrimatResult<Vec<f64>> {
        for &(row, col) in coords {
            check_cell(row, col, self.rows, self.cols)?;
        }
        Ok(coords.iter().map(|&(row, col)| self.cell(row, col)).collect())
    }

    fn read_submatrix(&self, rows: Range<usize>, cols: Range<usize>) -> TrimatResult<DenseMatrix> {
        check_range("row", &rows, self.rows)?;
        check_range("column", &cols, self.cols)?;

        let mut values = Vec::with_capacity(rows.len() * cols.len());
        for row in rows.clone() {
            let start = (row * self.cols + cols.start) * F64_SIZE;
            let end = (row * self.cols + cols.end) * F64_SIZE;
            values.extend(
                self.data[start..end]
                    .chunks_exact(F64_SIZE)
                    .map(|chunk| {
                        let mut raw = [0u8; F64_SIZE];
                        raw.copy_from_slice(chunk);
                        f64::from_le_bytes(raw)
                    }),
            );
        }
        let row_labels = self.row_labels.as_ref().map(|l| Labels::from(&l[rows.clone()]));
        let col_labels = self.col_labels.as_ref().map(|l| Labels::from(&l[cols.clone()]));
        DenseMatrix::try_new(rows.len(), cols.len(), values)?.with_axis_labels(row_labels, col_labels)
    }
}

impl Debug for MmapBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapBlock")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("bytes", &self.data.len())
            .finish()
    }
}
