use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use trimat_array::{BlockHandle, BlockRef, DenseMatrix, check_cell, check_range};
use trimat_error::TrimatResult;

use crate::{LabelIndex, ReadOptions, Selector, Triangle, ValidatedLayout, validate};

/// The 1-based, inclusive range of matrix positions covered by one block row (and the block
/// column with the same index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBoundary {
    /// The 1-based block index.
    pub block: usize,
    /// The first matrix position in the block.
    pub first: usize,
    /// The last matrix position in the block.
    pub last: usize,
}

impl BlockBoundary {
    /// The number of positions in the block. Blocks are never empty.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.last + 1 - self.first
    }

    /// The 0-based, half-open range of the block.
    pub fn range(&self) -> Range<usize> {
        self.first - 1..self.last
    }
}

/// A symmetric `n x n` matrix stored as the diagonal and upper-triangular blocks of a `q x q`
/// block grid.
///
/// All blocks but the final block row and column are `block_size x block_size`; the final ones
/// may be narrower. Reads below the diagonal are answered from the mirrored block above it.
///
/// A layout is immutable and cheap to clone. Its blocks are opened once and stay resident for as
/// long as any clone is alive.
#[derive(Clone)]
pub struct BlockLayout {
    blocks: Arc<Triangle<BlockRef>>,
    sources: Option<Arc<Triangle<PathBuf>>>,
    centers: Arc<[f64]>,
    scales: Arc<[f64]>,
    dimension: usize,
    block_size: usize,
    last_block_size: usize,
    labels: Option<Arc<LabelIndex>>,
    read_options: ReadOptions,
}

impl BlockLayout {
    /// Validate nested block rows and assemble them into a layout.
    ///
    /// Row `r` (0-based) holds the blocks `(r, r), (r, r + 1), ..., (r, q - 1)`.
    pub fn try_new(
        rows: Vec<Vec<BlockRef>>,
        centers: Vec<f64>,
        scales: Vec<f64>,
    ) -> TrimatResult<Self> {
        Ok(Self::from(validate(rows, centers, scales)?))
    }

    pub(crate) fn with_sources(mut self, sources: Triangle<PathBuf>) -> Self {
        debug_assert_eq!(sources.side(), self.blocks.side());
        self.sources = Some(Arc::new(sources));
        self
    }

    /// Use `options` for subsequent reads.
    pub fn with_read_options(mut self, options: ReadOptions) -> Self {
        self.read_options = options;
        self
    }

    /// The options reads use.
    pub fn read_options(&self) -> &ReadOptions {
        &self.read_options
    }

    /// `(n, n)`.
    pub fn dimension(&self) -> (usize, usize) {
        (self.dimension, self.dimension)
    }

    /// The number of block rows, `q`.
    pub fn block_count(&self) -> usize {
        self.blocks.side()
    }

    /// The size of every block but the final ones, or of the final block row and column if
    /// `use_last` is set.
    pub fn block_size(&self, use_last: bool) -> usize {
        if use_last {
            self.last_block_size
        } else {
            self.block_size
        }
    }

    /// The `n` labels shared by rows and columns, if every diagonal block carries column labels.
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_ref().map(|index| &index.labels()[..])
    }

    /// The labels with their position lookup.
    pub fn label_index(&self) -> Option<&LabelIndex> {
        self.labels.as_deref()
    }

    /// Row and column labels, if present.
    pub fn dimnames(&self) -> Option<(&[String], &[String])> {
        self.labels().map(|labels| (labels, labels))
    }

    /// The partition of `1..=n` into block ranges.
    pub fn block_boundaries(&self) -> Vec<BlockBoundary> {
        (0..self.blocks.side())
            .map(|block| BlockBoundary {
                block: block + 1,
                first: block * self.block_size + 1,
                last: (block * self.block_size + self.block_size).min(self.dimension),
            })
            .collect()
    }

    /// The 1-based block index holding the 1-based matrix position, or `None` if the position
    /// is outside `1..=n`.
    pub fn block_of(&self, position: usize) -> Option<usize> {
        (1..=self.dimension)
            .contains(&position)
            .then(|| position.div_ceil(self.block_size))
    }

    /// Per-column centering applied before the matrix was computed. Empty if not recorded.
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Per-column scaling applied before the matrix was computed. Empty if not recorded.
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// The stored block at 1-based block coordinates, if `row <= col <= q`.
    pub fn block(&self, row: usize, col: usize) -> Option<&BlockRef> {
        if row == 0 || col == 0 {
            return None;
        }
        self.blocks.get(row - 1, col - 1)
    }

    /// The stored blocks.
    pub fn blocks(&self) -> &Triangle<BlockRef> {
        &self.blocks
    }

    /// The paths the blocks were written to or opened from, if the layout is store-backed.
    pub fn sources(&self) -> Option<&Triangle<PathBuf>> {
        self.sources.as_deref()
    }

    /// The 0-based block coordinate and the 0-based position within that block of the 1-based
    /// matrix cell `(row, col)`, mirrored into the upper triangle.
    #[inline]
    pub(crate) fn locate(&self, row: usize, col: usize) -> ((usize, usize), (usize, usize)) {
        let (row, col) = if row > col { (col, row) } else { (row, col) };
        let (row, col) = (row - 1, col - 1);
        let size = self.block_size;
        ((row / size, col / size), (row % size, col % size))
    }
}

impl From<ValidatedLayout> for BlockLayout {
    fn from(layout: ValidatedLayout) -> Self {
        let ValidatedLayout {
            blocks,
            centers,
            scales,
            dimension,
            block_size,
            last_block_size,
        } = layout;

        let labels = (0..blocks.side())
            .map(|diagonal| {
                blocks
                    .get(diagonal, diagonal)
                    .and_then(|block| block.col_labels())
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| Arc::new(LabelIndex::new(parts.concat().into())));

        Self {
            blocks: Arc::new(blocks),
            sources: None,
            centers,
            scales,
            dimension,
            block_size,
            last_block_size,
            labels,
            read_options: ReadOptions::default(),
        }
    }
}

impl Debug for BlockLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockLayout")
            .field("dimension", &self.dimension)
            .field("block_count", &self.blocks.side())
            .field("block_size", &self.block_size)
            .field("last_block_size", &self.last_block_size)
            .field("labelled", &self.labels.is_some())
            .finish()
    }
}

/// A layout reads like any other block, which lets it be the source of a re-blocking build.
impl BlockHandle for BlockLayout {
    fn rows(&self) -> usize {
        self.dimension
    }

    fn cols(&self) -> usize {
        self.dimension
    }

    fn row_labels(&self) -> Option<&[String]> {
        self.labels()
    }

    fn col_labels(&self) -> Option<&[String]> {
        self.labels()
    }

    fn read_element(&self, row: usize, col: usize) -> TrimatResult<f64> {
        check_cell(row, col, self.dimension, self.dimension)?;
        Ok(self.gather(&[(row + 1, col + 1)])?[0])
    }

    fn read_elements(&self, coords: &[(usize, usize)]) -> TrimatResult<Vec<f64>> {
        let pairs = coords
            .iter()
            .map(|&(row, col)| {
                check_cell(row, col, self.dimension, self.dimension).map(|_| (row + 1, col + 1))
            })
            .collect::<TrimatResult<Vec<_>>>()?;
        self.gather(&pairs)
    }

    fn read_submatrix(&self, rows: Range<usize>, cols: Range<usize>) -> TrimatResult<DenseMatrix> {
        check_range("row", &rows, self.dimension)?;
        check_range("column", &cols, self.dimension)?;
        self.get_matrix(
            Selector::Positions((rows.start + 1..=rows.end).collect()),
            Selector::Positions((cols.start + 1..=cols.end).collect()),
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn labels(range: Range<usize>) -> Vec<String> {
        range.map(|i| format!("ID_{}", i + 1)).collect()
    }

    /// A layout over `n x n` blocks of zeros, labelled on the diagonal if `labelled`.
    fn layout(sizes: &[usize], labelled: bool) -> BlockLayout {
        let starts: Vec<usize> = sizes
            .iter()
            .scan(0, |offset, size| {
                let start = *offset;
                *offset += size;
                Some(start)
            })
            .collect();
        let rows = (0..sizes.len())
            .map(|r| {
                (r..sizes.len())
                    .map(|c| {
                        let mut block = DenseMatrix::zeros(sizes[r], sizes[c]);
                        if labelled && r == c {
                            block = block
                                .with_labels(labels(starts[r]..starts[r] + sizes[r]))
                                .unwrap();
                        }
                        Arc::new(block) as BlockRef
                    })
                    .collect()
            })
            .collect();
        BlockLayout::try_new(rows, vec![], vec![]).unwrap()
    }

    #[test]
    fn geometry_of_uneven_layout() {
        let layout = layout(&[4, 4, 2], true);
        assert_eq!(layout.dimension(), (10, 10));
        assert_eq!(layout.block_count(), 3);
        assert_eq!(layout.block_size(false), 4);
        assert_eq!(layout.block_size(true), 2);
        assert_eq!(
            layout.block_boundaries(),
            vec![
                BlockBoundary { block: 1, first: 1, last: 4 },
                BlockBoundary { block: 2, first: 5, last: 8 },
                BlockBoundary { block: 3, first: 9, last: 10 },
            ]
        );
        assert_eq!(layout.block_boundaries()[2].range(), 8..10);
        assert_eq!(layout.block_boundaries()[2].len(), 2);
        assert_eq!(layout.labels().unwrap().len(), 10);
        assert_eq!(layout.labels().unwrap()[9], "ID_10");
        assert!(layout.dimnames().is_some());
    }

    #[test]
    fn labels_are_all_or_nothing() {
        assert!(layout(&[2, 2], false).labels().is_none());
        assert!(layout(&[2, 2], false).dimnames().is_none());
    }

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(1))]
    #[case(4, Some(1))]
    #[case(5, Some(2))]
    #[case(10, Some(3))]
    #[case(11, None)]
    fn block_of_position(#[case] position: usize, #[case] block: Option<usize>) {
        assert_eq!(layout(&[4, 4, 2], false).block_of(position), block);
    }

    #[rstest]
    #[case((1, 1), ((0, 0), (0, 0)))]
    #[case((2, 7), ((0, 1), (1, 2)))]
    #[case((7, 2), ((0, 1), (1, 2)))]
    #[case((10, 9), ((2, 2), (0, 1)))]
    #[case((3, 10), ((0, 2), (2, 1)))]
    fn locate_mirrors_lower_triangle(
        #[case] cell: (usize, usize),
        #[case] expected: ((usize, usize), (usize, usize)),
    ) {
        assert_eq!(layout(&[4, 4, 2], false).locate(cell.0, cell.1), expected);
    }

    #[test]
    fn blocks_by_one_based_coordinates() {
        let layout = layout(&[4, 4, 2], false);
        assert_eq!(layout.block(1, 3).unwrap().cols(), 2);
        assert!(layout.block(3, 1).is_none());
        assert!(layout.block(0, 1).is_none());
        assert!(layout.block(1, 4).is_none());
    }
}
