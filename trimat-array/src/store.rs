use std::fmt::Debug;
use std::path::Path;

use trimat_error::TrimatResult;

use crate::{BlockRef, DenseMatrix};

/// A backend that persists blocks under local paths and reopens them as [`BlockRef`]s.
///
/// Stores never overwrite: writing to a path that already holds a block fails with an
/// [`std::io::ErrorKind::AlreadyExists`] storage error.
pub trait BlockStore: Send + Sync + Debug {
    /// The file extension used for blocks written by this store, without the leading dot.
    fn extension(&self) -> &str;

    /// Open the block stored at `path`.
    fn open(&self, path: &Path) -> TrimatResult<BlockRef>;

    /// Persist `block` at `path` and return a handle onto the persisted copy.
    fn write(&self, path: &Path, block: &DenseMatrix) -> TrimatResult<BlockRef>;
}
