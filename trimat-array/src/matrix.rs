use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::sync::Arc;

use itertools::Itertools;
use trimat_error::{TrimatResult, trimat_bail, trimat_err};

/// Names attached to the rows or columns of a matrix.
pub type Labels = Arc<[String]>;

/// An owned, row-major, two-dimensional array of `f64` with optional row and column labels.
///
/// Values are reference counted, so cloning a [`DenseMatrix`] is cheap. Coordinates are
/// 0-based.
#[derive(Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    values: Arc<[f64]>,
    row_labels: Option<Labels>,
    col_labels: Option<Labels>,
}

impl DenseMatrix {
    /// Create a matrix from row-major values.
    pub fn try_new(rows: usize, cols: usize, values: Vec<f64>) -> TrimatResult<Self> {
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| trimat_err!(InvalidShape: "{}x{} matrix overflows usize", rows, cols))?;
        if values.len() != expected {
            trimat_bail!(
                InvalidShape: "{}x{} matrix requires {} values, got {}",
                rows,
                cols,
                expected,
                values.len()
            );
        }
        Ok(Self {
            rows,
            cols,
            values: values.into(),
            row_labels: None,
            col_labels: None,
        })
    }

    /// Create a matrix by evaluating `f(row, col)` for every cell.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let values = (0..rows)
            .cartesian_product(0..cols)
            .map(|(row, col)| f(row, col))
            .collect();
        Self {
            rows,
            cols,
            values,
            row_labels: None,
            col_labels: None,
        }
    }

    /// Create a matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_fn(rows, cols, |_, _| 0.0)
    }

    /// Attach row labels, which must have one entry per row.
    pub fn with_row_labels<L: Into<Labels>>(mut self, labels: L) -> TrimatResult<Self> {
        let labels = labels.into();
        check_label_count("row", labels.len(), self.rows)?;
        self.row_labels = Some(labels);
        Ok(self)
    }

    /// Attach column labels, which must have one entry per column.
    pub fn with_col_labels<L: Into<Labels>>(mut self, labels: L) -> TrimatResult<Self> {
        let labels = labels.into();
        check_label_count("column", labels.len(), self.cols)?;
        self.col_labels = Some(labels);
        Ok(self)
    }

    /// Attach the same labels to rows and columns of a square matrix.
    pub fn with_labels<L: Into<Labels>>(self, labels: L) -> TrimatResult<Self> {
        let labels = labels.into();
        self.with_row_labels(labels.clone())?
            .with_col_labels(labels)
    }

    /// Replace both label sets at once. `None` clears the labels of that axis.
    pub fn with_axis_labels(
        mut self,
        row_labels: Option<Labels>,
        col_labels: Option<Labels>,
    ) -> TrimatResult<Self> {
        if let Some(labels) = &row_labels {
            check_label_count("row", labels.len(), self.rows)?;
        }
        if let Some(labels) = &col_labels {
            check_label_count("column", labels.len(), self.cols)?;
        }
        self.row_labels = row_labels;
        self.col_labels = col_labels;
        Ok(self)
    }

    /// The number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether the matrix has as many rows as columns.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Whether the matrix holds no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value at `(row, col)`.
    ///
    /// ## Panics
    ///
    /// Panics if the coordinate is out of bounds.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.rows && col < self.cols,
            "({row}, {col}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        self.values[row * self.cols + col]
    }

    /// The values of one row.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    /// Row labels, if any.
    pub fn row_labels(&self) -> Option<&[String]> {
        self.row_labels.as_deref()
    }

    /// Column labels, if any.
    pub fn col_labels(&self) -> Option<&[String]> {
        self.col_labels.as_deref()
    }

    /// Copy out the rectangle `rows x cols`, keeping the matching label ranges.
    pub fn slice(&self, rows: Range<usize>, cols: Range<usize>) -> TrimatResult<Self> {
        check_range("row", &rows, self.rows)?;
        check_range("column", &cols, self.cols)?;

        let mut values = Vec::with_capacity(rows.len() * cols.len());
        for row in rows.clone() {
            values.extend_from_slice(&self.row(row)[cols.clone()]);
        }
        Ok(Self {
            rows: rows.len(),
            cols: cols.len(),
            values: values.into(),
            row_labels: self.row_labels.as_ref().map(|l| Labels::from(&l[rows])),
            col_labels: self.col_labels.as_ref().map(|l| Labels::from(&l[cols])),
        })
    }

    /// Whether the matrix is square and equal to its transpose within `tolerance`.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        self.is_square()
            && (0..self.rows)
                .tuple_combinations()
                .all(|(i, j)| (self.value(i, j) - self.value(j, i)).abs() <= tolerance)
    }
}

fn check_label_count(axis: &str, labels: usize, extent: usize) -> TrimatResult<()> {
    if labels != extent {
        trimat_bail!(
            InvalidShape: "expected {} {} labels, got {}",
            extent,
            axis,
            labels
        );
    }
    Ok(())
}

/// Fail unless `range` is a valid, possibly empty, range within `0..extent`.
pub fn check_range(axis: &str, range: &Range<usize>, extent: usize) -> TrimatResult<()> {
    if range.start > range.end || range.end > extent {
        trimat_bail!(
            InvalidArgument: "{} range {:?} is invalid for extent {}",
            axis,
            range,
            extent
        );
    }
    Ok(())
}

impl Debug for DenseMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("labelled", &(self.row_labels.is_some(), self.col_labels.is_some()))
            .finish()
    }
}
