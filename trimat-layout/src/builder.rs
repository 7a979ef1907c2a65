use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use trimat_array::{BlockHandle, BlockRef, BlockStore};
use trimat_error::{TrimatResult, trimat_bail, trimat_err};
use trimat_file::FileBlockStore;

use crate::validate::check_scaling;
use crate::{BlockLayout, Triangle, block_file_name};

/// The tolerance of the symmetry check run over diagonal blocks while building.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Options for [`MatrixBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// The size of every block but the final block row and column.
    pub block_size: usize,
    /// The prefix of block file names.
    pub file_prefix: String,
    /// The file name of the layout descriptor written next to the blocks.
    pub descriptor_name: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            block_size: 1000,
            file_prefix: "data".to_string(),
            descriptor_name: "layout.json".to_string(),
        }
    }
}

impl BuildOptions {
    /// Set the block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the block file name prefix.
    pub fn with_file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Set the descriptor file name.
    pub fn with_descriptor_name<S: Into<String>>(mut self, name: S) -> Self {
        self.descriptor_name = name.into();
        self
    }
}

/// The 0-based ranges of a greedy partition of `0..len` into chunks of `size`, the last of which
/// may be shorter.
pub fn partition(len: usize, size: usize) -> Vec<Range<usize>> {
    (0..len.div_ceil(size))
        .map(|block| block * size..(block * size + size).min(len))
        .collect()
}

/// Partitions a square matrix into blocks, persists the diagonal and upper-triangular blocks
/// through a [`BlockStore`] and assembles them into a [`BlockLayout`].
#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    options: BuildOptions,
    store: Arc<dyn BlockStore>,
}

impl Default for MatrixBuilder {
    fn default() -> Self {
        Self::new(BuildOptions::default())
    }
}

impl MatrixBuilder {
    /// A builder writing block files.
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            store: Arc::new(FileBlockStore),
        }
    }

    /// Persist blocks through `store` instead.
    pub fn with_store(mut self, store: Arc<dyn BlockStore>) -> Self {
        self.store = store;
        self
    }

    /// The options the builder uses.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build a layout from `source` into the new directory `dir`, without centering metadata.
    pub fn build(&self, source: &dyn BlockHandle, dir: &Path) -> TrimatResult<BlockLayout> {
        self.build_scaled(source, Vec::new(), Vec::new(), dir)
    }

    /// Build a layout from `source` into the new directory `dir`.
    ///
    /// Fails with [`InvalidShape`](trimat_error::TrimatError::InvalidShape) unless `source` is
    /// square and non-empty, and with an [`AlreadyExists`](std::io::ErrorKind::AlreadyExists)
    /// I/O error if `dir` exists. Blocks carry the matching ranges of `source`'s labels. The
    /// layout descriptor is written to `dir` once every block is persisted. If any step after
    /// creating `dir` fails, `dir` is removed again.
    pub fn build_scaled(
        &self,
        source: &dyn BlockHandle,
        centers: Vec<f64>,
        scales: Vec<f64>,
        dir: &Path,
    ) -> TrimatResult<BlockLayout> {
        let n = source.rows();
        if n != source.cols() {
            trimat_bail!(
                InvalidShape: "cannot build a symmetric layout from a {}x{} matrix",
                n,
                source.cols()
            );
        }
        if n == 0 {
            trimat_bail!(InvalidShape: "cannot build a layout from an empty matrix");
        }
        let block_size = self.options.block_size;
        if block_size == 0 {
            trimat_bail!("block size must be positive");
        }
        check_scaling(n, &centers, &scales)?;

        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(dir)
            .map_err(|e| trimat_err!(IOError: e).with_context(format!("creating {}", dir.display())))?;

        self.write_layout(source, centers, scales, dir).inspect_err(|err| {
            log::debug!("build into {} failed, removing it: {}", dir.display(), err.root());
            if let Err(cleanup) = fs::remove_dir_all(dir) {
                log::warn!("failed to remove partial layout {}: {}", dir.display(), cleanup);
            }
        })
    }

    /// Write every block and the descriptor into the freshly created `dir`.
    fn write_layout(
        &self,
        source: &dyn BlockHandle,
        centers: Vec<f64>,
        scales: Vec<f64>,
        dir: &Path,
    ) -> TrimatResult<BlockLayout> {
        let n = source.rows();
        let block_size = self.options.block_size;
        let bounds = partition(n, block_size);
        let q = bounds.len();
        log::debug!(
            "building {}x{} layout of {} blocks (block size {}) in {}",
            n,
            n,
            q * (q + 1) / 2,
            block_size,
            dir.display()
        );

        let mut rows: Vec<Vec<BlockRef>> = Vec::with_capacity(q);
        let mut sources: Vec<PathBuf> = Vec::with_capacity(q * (q + 1) / 2);
        let mut asymmetric = false;
        for row in 0..q {
            let mut blocks = Vec::with_capacity(q - row);
            for col in row..q {
                let block = source.read_submatrix(bounds[row].clone(), bounds[col].clone())?;
                if row == col && !block.is_symmetric(SYMMETRY_TOLERANCE) {
                    asymmetric = true;
                }

                let name = block_file_name(
                    &self.options.file_prefix,
                    row + 1,
                    col + 1,
                    q,
                    self.store.extension(),
                );
                let path = dir.join(name);
                let handle = self.store.write(&path, &block)?;
                log::debug!("wrote block ({}, {}) to {}", row + 1, col + 1, path.display());
                blocks.push(handle);
                sources.push(path);
            }
            rows.push(blocks);
        }
        if asymmetric {
            log::warn!(
                "diagonal blocks of the source are not symmetric; reads below the diagonal return the mirrored upper-triangle values"
            );
        }

        let layout = BlockLayout::try_new(rows, centers, scales)?
            .with_sources(Triangle::try_from_flat(sources)?);
        layout.save_descriptor(&dir.join(&self.options.descriptor_name))?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use trimat_array::{DenseMatrix, InMemoryBlockStore};
    use trimat_error::TrimatError;

    use super::*;

    #[rstest]
    #[case(10, 4, vec![0..4, 4..8, 8..10])]
    #[case(8, 4, vec![0..4, 4..8])]
    #[case(3, 5, vec![0..3])]
    #[case(1, 1, vec![0..1])]
    fn greedy_partition(#[case] len: usize, #[case] size: usize, #[case] expected: Vec<Range<usize>>) {
        assert_eq!(partition(len, size), expected);
    }

    fn builder(block_size: usize) -> (MatrixBuilder, Arc<InMemoryBlockStore>) {
        let store = Arc::new(InMemoryBlockStore::default());
        let builder = MatrixBuilder::new(BuildOptions::default().with_block_size(block_size))
            .with_store(store.clone());
        (builder, store)
    }

    #[test]
    fn writes_triangle_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("layout");
        let (builder, store) = builder(4);
        let source = DenseMatrix::from_fn(10, 10, |i, j| (i + j) as f64);

        let layout = builder.build(&source, &target).unwrap();
        assert_eq!(layout.block_count(), 3);
        assert_eq!(store.len(), 6);
        assert!(store.contains(&target.join("data_1_3.mem")));
        assert!(!store.contains(&target.join("data_3_1.mem")));
        assert!(target.join("layout.json").exists());
    }

    #[test]
    fn rejects_non_square_source() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, _) = builder(2);
        let err = builder
            .build(&DenseMatrix::zeros(3, 4), &dir.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, TrimatError::InvalidShape(..)));
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn rejects_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, _) = builder(2);
        let err = builder
            .build(&DenseMatrix::zeros(3, 3), dir.path())
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn failed_build_removes_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("layout");
        let (first, store) = builder(2);
        store
            .write(&target.join("data_1_2.mem"), &DenseMatrix::zeros(2, 1))
            .unwrap();
        let source = DenseMatrix::from_fn(3, 3, |i, j| (i + j) as f64);

        let err = first.build(&source, &target).unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::AlreadyExists));
        assert!(!target.exists());

        let (retry, _) = builder(2);
        let layout = retry.build(&source, &target).unwrap();
        assert_eq!(layout.block_count(), 2);
        assert!(target.join("layout.json").exists());
    }

    #[test]
    fn rejects_zero_block_size() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, _) = builder(0);
        let err = builder
            .build(&DenseMatrix::zeros(3, 3), &dir.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, TrimatError::InvalidArgument(..)));
    }

    #[test]
    fn centers_and_scales_are_checked() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, _) = builder(2);
        let err = builder
            .build_scaled(
                &DenseMatrix::zeros(3, 3),
                vec![0.0; 3],
                vec![1.0; 2],
                &dir.path().join("x"),
            )
            .unwrap_err();
        assert!(matches!(err, TrimatError::InvalidArgument(..)));
        assert!(!dir.path().join("x").exists());
    }
}
