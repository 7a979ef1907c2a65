use itertools::Itertools;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use trimat_array::DenseMatrix;
use trimat_error::{TrimatResult, trimat_bail, trimat_err};

use crate::{BlockLayout, Selector};

/// Options for reads from a [`BlockLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Fetch distinct blocks concurrently.
    pub parallel: bool,
    /// The minimum number of distinct blocks a read must touch before it is fetched concurrently.
    pub parallel_threshold: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 2,
        }
    }
}

impl ReadOptions {
    /// Enable or disable concurrent block fetches.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the number of distinct blocks from which fetches run concurrently.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

/// The result of [`BlockLayout::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieved {
    /// An `nI x nJ` matrix, labelled when the layout is.
    Matrix(DenseMatrix),
    /// A single row or column, dropped to its values.
    Vector(Vec<f64>),
}

impl Retrieved {
    /// The retrieved values, row-major for matrices.
    pub fn values(&self) -> &[f64] {
        match self {
            Self::Matrix(matrix) => matrix.values(),
            Self::Vector(values) => values,
        }
    }

    /// The matrix, unless the result was dropped to a vector.
    pub fn into_matrix(self) -> Option<DenseMatrix> {
        match self {
            Self::Matrix(matrix) => Some(matrix),
            Self::Vector(_) => None,
        }
    }

    /// The retrieved values as a flat vector, row-major for matrices.
    pub fn into_vector(self) -> Vec<f64> {
        match self {
            Self::Matrix(matrix) => matrix.values().to_vec(),
            Self::Vector(values) => values,
        }
    }
}

/// The cells one read needs from a single block.
#[derive(Debug, Default)]
struct BlockRequest {
    /// Where each cell goes in the output.
    outputs: Vec<usize>,
    /// 0-based coordinates within the block.
    coords: Vec<(usize, usize)>,
}

impl BlockLayout {
    /// Read the cells at every combination of the selected rows and columns.
    ///
    /// With `drop` set, a result with exactly one row or one column is returned as a flat
    /// [`Retrieved::Vector`]. Otherwise the result is an `nI x nJ` [`Retrieved::Matrix`] whose
    /// labels follow the requested order.
    pub fn get<R, C>(&self, rows: R, cols: C, drop: bool) -> TrimatResult<Retrieved>
    where
        R: Into<Selector>,
        C: Into<Selector>,
    {
        let matrix = self.get_matrix(rows, cols)?;
        if drop && (matrix.rows() == 1 || matrix.cols() == 1) {
            return Ok(Retrieved::Vector(matrix.values().to_vec()));
        }
        Ok(Retrieved::Matrix(matrix))
    }

    /// Read the cells at every combination of the selected rows and columns, never dropping.
    pub fn get_matrix<R, C>(&self, rows: R, cols: C) -> TrimatResult<DenseMatrix>
    where
        R: Into<Selector>,
        C: Into<Selector>,
    {
        let (n, _) = self.dimension();
        let labels = self.label_index();
        let rows = rows.into().positions(n, labels)?;
        let cols = cols.into().positions(n, labels)?;

        let pairs = rows
            .iter()
            .copied()
            .cartesian_product(cols.iter().copied())
            .collect::<Vec<_>>();
        let values = self.gather(&pairs)?;

        DenseMatrix::try_new(rows.len(), cols.len(), values)?.with_axis_labels(
            labels.map(|index| index.select(&rows)),
            labels.map(|index| index.select(&cols)),
        )
    }

    /// Read cells by their position in the column-major flattening of the matrix.
    ///
    /// Flat position `k` is the cell at row `((k - 1) mod n) + 1`, column
    /// `((k - 1) div n) + 1`. Label selectors are rejected.
    pub fn get_flat<S: Into<Selector>>(&self, selector: S) -> TrimatResult<Vec<f64>> {
        let pairs = selector.into().flat_pairs(self.dimension().0)?;
        self.gather(&pairs)
    }

    /// Read the cells at explicit 1-based `(row, col)` pairs, in order.
    pub fn get_pairs(&self, pairs: &[(usize, usize)]) -> TrimatResult<Vec<f64>> {
        let (n, _) = self.dimension();
        for &(row, col) in pairs {
            for position in [row, col] {
                if position == 0 || position > n {
                    trimat_bail!(OutOfBounds: position, 1, n);
                }
            }
        }
        self.gather(pairs)
    }

    /// Read the cell at 1-based `(row, col)`.
    pub fn element(&self, row: usize, col: usize) -> TrimatResult<f64> {
        self.get_pairs(&[(row, col)])?
            .pop()
            .ok_or_else(|| trimat_err!("no value read for ({}, {})", row, col))
    }

    /// Read 1-based cells that are known to be in bounds.
    ///
    /// Cells are mirrored into the upper triangle and grouped by block, so each touched block is
    /// read once no matter how many of its cells are requested.
    pub(crate) fn gather(&self, pairs: &[(usize, usize)]) -> TrimatResult<Vec<f64>> {
        let mut requests: FxHashMap<(usize, usize), BlockRequest> = FxHashMap::default();
        for (output, &(row, col)) in pairs.iter().enumerate() {
            let (block, local) = self.locate(row, col);
            let request = requests.entry(block).or_default();
            request.outputs.push(output);
            request.coords.push(local);
        }
        let mut requests = requests.into_iter().collect::<Vec<_>>();
        requests.sort_unstable_by_key(|(block, _)| *block);

        let options = self.read_options();
        let parallel = options.parallel && requests.len() >= options.parallel_threshold;
        log::trace!(
            "reading {} cells from {} of {} blocks{}",
            pairs.len(),
            requests.len(),
            self.blocks().len(),
            if parallel { " in parallel" } else { "" }
        );

        let fetch = |(block, request): &((usize, usize), BlockRequest)| -> TrimatResult<Vec<f64>> {
            let handle = self.blocks().get(block.0, block.1).ok_or_else(|| {
                trimat_err!(InvalidLayout: "no block stored at ({}, {})", block.0 + 1, block.1 + 1)
            })?;
            handle.read_elements(&request.coords).map_err(|err| {
                err.with_context(format!("reading block ({}, {})", block.0 + 1, block.1 + 1))
            })
        };
        let fetched: Vec<Vec<f64>> = if parallel {
            requests.par_iter().map(fetch).collect::<TrimatResult<_>>()?
        } else {
            requests.iter().map(fetch).collect::<TrimatResult<_>>()?
        };

        let mut values = vec![0.0; pairs.len()];
        for ((_, request), block_values) in requests.iter().zip(fetched) {
            for (&output, value) in request.outputs.iter().zip(block_values) {
                values[output] = value;
            }
        }
        Ok(values)
    }
}
