use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use trimat_error::TrimatResult;

use crate::{BlockRef, BlockStore, DenseMatrix};

/// A [`BlockStore`] that keeps blocks in memory, keyed by path.
///
/// Nothing touches the filesystem, which makes it suitable for transient layouts and tests.
#[derive(Debug, Default)]
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<PathBuf, Arc<DenseMatrix>>>,
}

impl InMemoryBlockStore {
    /// The number of blocks held by the store.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether the store holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Whether a block has been written at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.blocks.read().contains_key(path)
    }
}

impl BlockStore for InMemoryBlockStore {
    fn extension(&self) -> &str {
        "mem"
    }

    fn open(&self, path: &Path) -> TrimatResult<BlockRef> {
        let block = self.blocks.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no block stored at {}", path.display()),
            )
        })?;
        Ok(block)
    }

    fn write(&self, path: &Path, block: &DenseMatrix) -> TrimatResult<BlockRef> {
        let mut blocks = self.blocks.write();
        if blocks.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("a block is already stored at {}", path.display()),
            )
            .into());
        }
        let block = Arc::new(block.clone());
        blocks.insert(path.to_path_buf(), block.clone());
        Ok(block)
    }
}
