use std::sync::Arc;

use trimat_array::BlockRef;
use trimat_error::{TrimatResult, trimat_bail};

use crate::Triangle;

/// A triangular block collection that has passed every structural check, together with the
/// geometry derived while checking it.
#[derive(Debug, Clone)]
pub struct ValidatedLayout {
    pub(crate) blocks: Triangle<BlockRef>,
    pub(crate) centers: Arc<[f64]>,
    pub(crate) scales: Arc<[f64]>,
    pub(crate) dimension: usize,
    pub(crate) block_size: usize,
    pub(crate) last_block_size: usize,
}

/// Check that nested block rows form a well-formed block-triangular layout.
///
/// Row `r` (0-based) must hold `q - r` blocks starting at the diagonal. See
/// [`validate_triangle`] for the remaining checks.
pub fn validate(
    rows: Vec<Vec<BlockRef>>,
    centers: Vec<f64>,
    scales: Vec<f64>,
) -> TrimatResult<ValidatedLayout> {
    if rows.is_empty() {
        trimat_bail!(InvalidLayout: "a layout needs at least one block row");
    }
    validate_triangle(Triangle::from_rows(rows)?, centers, scales)
}

/// Check the blocks of a triangle in one pass, failing on the first violation:
///
/// * there is at least one block row;
/// * blocks of one block row share a row count and blocks of one block column share a column
///   count;
/// * every block outside the final block row and column is square, as is the final diagonal
///   block;
/// * all blocks but the final block row and column have the same size, which is not smaller
///   than the final one, and no block is empty.
///
/// `centers` and `scales` must either both be empty or both hold one value per matrix column.
pub fn validate_triangle(
    blocks: Triangle<BlockRef>,
    centers: Vec<f64>,
    scales: Vec<f64>,
) -> TrimatResult<ValidatedLayout> {
    let q = blocks.side();
    if q == 0 {
        trimat_bail!(InvalidLayout: "a layout needs at least one block row");
    }

    let mut row_dims: Vec<Option<usize>> = vec![None; q];
    let mut col_dims: Vec<Option<usize>> = vec![None; q];
    for ((row, col), block) in blocks.iter() {
        let (rows, cols) = (block.rows(), block.cols());
        match row_dims[row] {
            None => row_dims[row] = Some(rows),
            Some(expected) if expected != rows => trimat_bail!(
                InvalidLayout: "block ({}, {}) has {} rows but block row {} has {}",
                row + 1,
                col + 1,
                rows,
                row + 1,
                expected
            ),
            Some(_) => {}
        }
        match col_dims[col] {
            None => col_dims[col] = Some(cols),
            Some(expected) if expected != cols => trimat_bail!(
                InvalidLayout: "block ({}, {}) has {} columns but block column {} has {}",
                row + 1,
                col + 1,
                cols,
                col + 1,
                expected
            ),
            Some(_) => {}
        }

        let interior = col + 1 < q;
        if (interior || row == col) && rows != cols {
            trimat_bail!(
                InvalidLayout: "block ({}, {}) is {}x{} but only off-diagonal blocks of the final block column may be non-square",
                row + 1,
                col + 1,
                rows,
                cols
            );
        }
        if rows == 0 || cols == 0 {
            trimat_bail!(InvalidLayout: "block ({}, {}) is empty", row + 1, col + 1);
        }
    }

    // Every block column was visited: block row 0 spans the full width.
    let sizes: Vec<usize> = col_dims.into_iter().flatten().collect();
    let block_size = sizes[0];
    let last_block_size = sizes[q - 1];
    if let Some(col) = sizes[..q - 1].iter().position(|&size| size != block_size) {
        trimat_bail!(
            InvalidLayout: "block column {} has size {} but the block size is {}",
            col + 1,
            sizes[col],
            block_size
        );
    }
    if last_block_size > block_size {
        trimat_bail!(
            InvalidLayout: "the final block column has size {}, larger than the block size {}",
            last_block_size,
            block_size
        );
    }

    let dimension = sizes.iter().sum();
    check_scaling(dimension, &centers, &scales)?;

    log::trace!(
        "validated {}x{} layout of {} blocks, block size {} (last {})",
        dimension,
        dimension,
        blocks.len(),
        block_size,
        last_block_size
    );
    Ok(ValidatedLayout {
        blocks,
        centers: centers.into(),
        scales: scales.into(),
        dimension,
        block_size,
        last_block_size,
    })
}

/// `centers` and `scales` must either both be empty or both hold `dimension` values.
pub(crate) fn check_scaling(dimension: usize, centers: &[f64], scales: &[f64]) -> TrimatResult<()> {
    if centers.len() != scales.len() || (!centers.is_empty() && centers.len() != dimension) {
        trimat_bail!(
            InvalidArgument: "centers and scales must both be empty or both hold {} values, got {} and {}",
            dimension,
            centers.len(),
            scales.len()
        );
    }
    Ok(())
}
