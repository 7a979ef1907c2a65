use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use trimat_array::{BlockRef, BlockStore, DenseMatrix};
use trimat_error::{TrimatResult, trimat_err};

use crate::{BLOCK_ENTRY_NAME, BLOCK_FILE_EXTENSION, BlockFile, BlockFileWriter};

/// A [`BlockStore`] that writes one block file per block and reopens them memory-mapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBlockStore;

impl BlockStore for FileBlockStore {
    fn extension(&self) -> &str {
        BLOCK_FILE_EXTENSION
    }

    fn open(&self, path: &Path) -> TrimatResult<BlockRef> {
        let block = BlockFile::open(path)?.block()?;
        log::trace!("opened {:?} from {}", block, path.display());
        Ok(Arc::new(block))
    }

    fn write(&self, path: &Path, block: &DenseMatrix) -> TrimatResult<BlockRef> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| trimat_err!(IOError: e).with_context(format!("creating {}", path.display())))?;

        let mut writer = BlockFileWriter::new(BufWriter::new(file));
        writer.push_matrix(BLOCK_ENTRY_NAME, block)?;
        let file = writer
            .finish()?
            .into_inner()
            .map_err(|e| trimat_err!(IOError: e.into_error()))?;
        file.sync_all()?;

        log::debug!(
            "wrote {}x{} block to {}",
            block.rows(),
            block.cols(),
            path.display()
        );
        self.open(path)
    }
}
