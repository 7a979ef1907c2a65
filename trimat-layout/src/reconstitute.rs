use std::path::{Path, PathBuf};

use trimat_array::{BlockRef, BlockStore};
use trimat_error::{TrimatResult, trimat_bail, trimat_err};
use trimat_file::FileBlockStore;

use crate::descriptor::relative_path;
use crate::{
    BlockDescriptor, BlockLayout, DESCRIPTOR_VERSION, LayoutDescriptor, Triangle, validate_triangle,
};

/// The directory relative paths in a descriptor are resolved against.
fn descriptor_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl BlockLayout {
    /// Reopen the layout described by the descriptor at `path`, reading block files.
    pub fn open<P: AsRef<Path>>(path: P) -> TrimatResult<Self> {
        Self::open_with_store(path, &FileBlockStore)
    }

    /// Reopen the layout described by the descriptor at `path`, reading blocks through `store`.
    ///
    /// Block paths are resolved against the descriptor's directory, so a layout directory can be
    /// moved as a whole. Every block is opened before the layout is returned.
    pub fn open_with_store<P: AsRef<Path>>(path: P, store: &dyn BlockStore) -> TrimatResult<Self> {
        let path = path.as_ref();
        let descriptor = LayoutDescriptor::read(path)?;
        let base = descriptor_dir(path);

        let mut blocks: Vec<BlockRef> = Vec::with_capacity(descriptor.blocks.len());
        let mut sources = Vec::with_capacity(descriptor.blocks.len());
        for entry in &descriptor.blocks {
            let source = entry.resolve(base);
            let block = store
                .open(&source)
                .map_err(|e| e.with_context(format!("reopening block {}", source.display())))?;
            if (block.rows(), block.cols()) != (entry.rows, entry.cols) {
                trimat_bail!(
                    InvalidLayout: "block {} is {}x{} but the descriptor declares {}x{}",
                    source.display(),
                    block.rows(),
                    block.cols(),
                    entry.rows,
                    entry.cols
                );
            }
            if block.row_labels() != entry.row_labels.as_deref()
                || block.col_labels() != entry.col_labels.as_deref()
            {
                trimat_bail!(
                    InvalidLayout: "the labels of block {} differ from the descriptor",
                    source.display()
                );
            }
            log::debug!("reopened block {}", source.display());
            blocks.push(block);
            sources.push(source);
        }

        let blocks = Triangle::try_from_flat(blocks)?;
        let layout = Self::from(validate_triangle(
            blocks,
            descriptor.centers,
            descriptor.scales,
        )?);
        Ok(layout.with_sources(Triangle::try_from_flat(sources)?))
    }

    /// Reassemble a layout from block files listed in canonical triangular order:
    /// `(1, 1), (1, 2), ..., (1, q), (2, 2), ..., (q, q)`.
    ///
    /// Fails with [`InvalidShape`](trimat_error::TrimatError::InvalidShape) unless the number of
    /// files is `q * (q + 1) / 2` for some `q >= 1`, and with
    /// [`Ambiguous`](trimat_error::TrimatError::Ambiguous) if a file does not hold exactly one
    /// matrix.
    pub fn from_block_files<P: AsRef<Path>>(
        paths: &[P],
        centers: Vec<f64>,
        scales: Vec<f64>,
    ) -> TrimatResult<Self> {
        Self::from_block_files_with_store(paths, centers, scales, &FileBlockStore)
    }

    /// As [`BlockLayout::from_block_files`], reading blocks through `store`.
    pub fn from_block_files_with_store<P: AsRef<Path>>(
        paths: &[P],
        centers: Vec<f64>,
        scales: Vec<f64>,
        store: &dyn BlockStore,
    ) -> TrimatResult<Self> {
        // Check the count before touching any file.
        let sources = Triangle::try_from_flat(
            paths
                .iter()
                .map(|p| p.as_ref().to_path_buf())
                .collect::<Vec<PathBuf>>(),
        )?;
        if sources.is_empty() {
            trimat_bail!(InvalidShape: "no block files given");
        }
        log::debug!(
            "reassembling {} block files as a {}x{} block triangle",
            sources.len(),
            sources.side(),
            sources.side()
        );

        let blocks = sources.try_map(|(row, col), source| {
            let block = store.open(source).map_err(|e| {
                e.with_context(format!(
                    "opening block ({}, {}) from {}",
                    row + 1,
                    col + 1,
                    source.display()
                ))
            })?;
            log::debug!("opened block ({}, {}) from {}", row + 1, col + 1, source.display());
            Ok(block)
        })?;

        Ok(Self::from(validate_triangle(blocks, centers, scales)?).with_sources(sources))
    }

    /// Describe the layout for later reopening with [`BlockLayout::open`], with block paths
    /// relative to `base`.
    ///
    /// Fails with [`InvalidArgument`](trimat_error::TrimatError::InvalidArgument) if the layout
    /// was not written to or opened from a store, or if a block lies outside `base`.
    pub fn descriptor(&self, base: &Path) -> TrimatResult<LayoutDescriptor> {
        let sources = self.sources().ok_or_else(|| {
            trimat_err!("the layout was not built or opened from stored blocks and cannot be described")
        })?;
        let blocks = sources
            .iter()
            .zip(self.blocks().cells())
            .map(|((_, source), block)| {
                Ok(BlockDescriptor {
                    path: relative_path(source, base)?,
                    rows: block.rows(),
                    cols: block.cols(),
                    row_labels: block.row_labels().map(<[String]>::to_vec),
                    col_labels: block.col_labels().map(<[String]>::to_vec),
                })
            })
            .collect::<TrimatResult<Vec<_>>>()?;

        Ok(LayoutDescriptor {
            version: DESCRIPTOR_VERSION,
            q: self.block_count(),
            blocks,
            centers: self.centers().to_vec(),
            scales: self.scales().to_vec(),
        })
    }

    /// Write a descriptor for the layout to the new file `path`, with block paths relative to
    /// its directory. Every block must lie under that directory.
    pub fn save_descriptor<P: AsRef<Path>>(&self, path: P) -> TrimatResult<()> {
        let path = path.as_ref();
        self.descriptor(descriptor_dir(path))?.write(path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use trimat_array::{DenseMatrix, InMemoryBlockStore};
    use trimat_error::TrimatError;

    use super::*;

    #[test]
    fn descriptor_dir_of_bare_name() {
        assert_eq!(descriptor_dir(Path::new("layout.json")), Path::new("."));
        assert_eq!(descriptor_dir(Path::new("a/layout.json")), Path::new("a"));
    }

    #[test]
    fn five_files_are_not_a_triangle() {
        let paths = (0..5).map(|i| format!("data_{i}.trmb")).collect::<Vec<_>>();
        let err = BlockLayout::from_block_files(&paths, vec![], vec![]).unwrap_err();
        assert!(matches!(err, TrimatError::InvalidShape(..)));

        let none: &[&str] = &[];
        let err = BlockLayout::from_block_files(none, vec![], vec![]).unwrap_err();
        assert!(matches!(err, TrimatError::InvalidShape(..)));
    }

    #[test]
    fn in_memory_blocks_reassemble() {
        let store = InMemoryBlockStore::default();
        let paths = ["b/11", "b/12", "b/22"].map(PathBuf::from);
        store.write(&paths[0], &DenseMatrix::from_fn(2, 2, |i, j| (i + j) as f64)).unwrap();
        store.write(&paths[1], &DenseMatrix::from_fn(2, 1, |i, _| 10.0 + i as f64)).unwrap();
        store.write(&paths[2], &DenseMatrix::from_fn(1, 1, |_, _| 20.0)).unwrap();

        let layout =
            BlockLayout::from_block_files_with_store(&paths, vec![], vec![], &store).unwrap();
        assert_eq!(layout.dimension(), (3, 3));
        assert_eq!(layout.element(3, 2).unwrap(), 11.0);
        assert_eq!(layout.element(3, 3).unwrap(), 20.0);
        assert_eq!(layout.sources().unwrap().get(0, 1), Some(&paths[1]));
    }

    fn labelled_block(labels: &[&str]) -> DenseMatrix {
        DenseMatrix::zeros(labels.len(), labels.len())
            .with_labels(labels.iter().map(|l| (*l).to_string()).collect::<Vec<_>>())
            .unwrap()
    }

    #[test]
    fn descriptor_labels_must_match_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryBlockStore::default();
        let path = dir.path().join("layout.json");
        store
            .write(&dir.path().join("data_1_1.mem"), &labelled_block(&["a", "b"]))
            .unwrap();

        let descriptor = |col_labels: &[&str]| LayoutDescriptor {
            version: DESCRIPTOR_VERSION,
            q: 1,
            blocks: vec![BlockDescriptor {
                path: "data_1_1.mem".to_string(),
                rows: 2,
                cols: 2,
                row_labels: Some(vec!["a".into(), "b".into()]),
                col_labels: Some(col_labels.iter().map(|l| (*l).to_string()).collect()),
            }],
            centers: vec![],
            scales: vec![],
        };

        descriptor(&["a", "z"]).write(&path).unwrap();
        let err = BlockLayout::open_with_store(&path, &store).unwrap_err();
        assert!(matches!(err, TrimatError::InvalidLayout(..)));

        std::fs::remove_file(&path).unwrap();
        descriptor(&["a", "b"]).write(&path).unwrap();
        let layout = BlockLayout::open_with_store(&path, &store).unwrap();
        assert_eq!(layout.labels().unwrap(), &["a", "b"]);
    }

    #[test]
    fn unbacked_layout_cannot_be_described() {
        let rows = vec![vec![Arc::new(DenseMatrix::zeros(1, 1)) as BlockRef]];
        let layout = BlockLayout::try_new(rows, vec![], vec![]).unwrap();
        assert!(matches!(
            layout.descriptor(Path::new(".")).unwrap_err(),
            TrimatError::InvalidArgument(..)
        ));
    }

    #[test]
    fn blocks_outside_the_descriptor_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryBlockStore::default();
        let path = dir.path().join("blocks").join("data_1_1.mem");
        store.write(&path, &DenseMatrix::zeros(2, 2)).unwrap();
        let layout =
            BlockLayout::from_block_files_with_store(&[&path], vec![], vec![], &store).unwrap();

        let elsewhere = dir.path().join("other").join("layout.json");
        assert!(matches!(
            layout.save_descriptor(&elsewhere).unwrap_err(),
            TrimatError::InvalidArgument(..)
        ));

        let descriptor = layout.descriptor(dir.path()).unwrap();
        assert_eq!(descriptor.blocks[0].path, "blocks/data_1_1.mem");
    }
}
