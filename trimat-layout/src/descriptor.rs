use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use trimat_error::{TrimatResult, trimat_bail, trimat_err};

use crate::triangular_len;

/// The current version of the layout descriptor format.
pub const DESCRIPTOR_VERSION: u32 = 1;

/// The persisted description of a [`BlockLayout`](crate::BlockLayout): where each block lives,
/// its shape and labels, and the centering metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    /// The descriptor format version.
    pub version: u32,
    /// The number of block rows.
    pub q: usize,
    /// The stored blocks, in canonical triangular order.
    pub blocks: Vec<BlockDescriptor>,
    /// Per-column centering. Empty if not recorded.
    pub centers: Vec<f64>,
    /// Per-column scaling. Empty if not recorded.
    pub scales: Vec<f64>,
}

/// One stored block of a [`LayoutDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    /// The block's path relative to the descriptor's directory, `/`-separated.
    pub path: String,
    /// The block's row count.
    pub rows: usize,
    /// The block's column count.
    pub cols: usize,
    /// The block's row labels, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_labels: Option<Vec<String>>,
    /// The block's column labels, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_labels: Option<Vec<String>>,
}

impl BlockDescriptor {
    /// The block's location, resolved against the descriptor's directory.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        self.path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(base.to_path_buf(), |path, part| path.join(part))
    }
}

impl LayoutDescriptor {
    /// Read and check a descriptor.
    pub fn read(path: &Path) -> TrimatResult<Self> {
        let file = File::open(path)
            .map_err(|e| trimat_err!(IOError: e).with_context(format!("opening {}", path.display())))?;
        let descriptor: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| trimat_err!(SerdeJsonError: e).with_context(format!("parsing {}", path.display())))?;
        descriptor.check()?;
        Ok(descriptor)
    }

    /// Write the descriptor to a new file at `path`. Existing files are never overwritten.
    pub fn write(&self, path: &Path) -> TrimatResult<()> {
        self.check()?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| trimat_err!(IOError: e).with_context(format!("creating {}", path.display())))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        log::debug!("wrote layout descriptor {}", path.display());
        Ok(())
    }

    fn check(&self) -> TrimatResult<()> {
        if self.version != DESCRIPTOR_VERSION {
            trimat_bail!(InvalidSerde: "unsupported layout descriptor version {}", self.version);
        }
        if self.blocks.len() != triangular_len(self.q) {
            trimat_bail!(
                InvalidSerde: "layout descriptor declares q = {} but lists {} blocks, expected {}",
                self.q,
                self.blocks.len(),
                triangular_len(self.q)
            );
        }
        for block in &self.blocks {
            let relative = Path::new(&block.path);
            if relative.is_absolute()
                || relative
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
            {
                trimat_bail!(
                    InvalidSerde: "block path {} must be relative to the descriptor's directory",
                    block.path
                );
            }
        }
        Ok(())
    }
}

/// `path` relative to `base`, `/`-separated, if `path` lies under `base`.
pub(crate) fn relative_path(path: &Path, base: &Path) -> TrimatResult<String> {
    let path = std::path::absolute(path)?;
    let base = std::path::absolute(base)?;
    let relative = path.strip_prefix(&base).map_err(|_| {
        trimat_err!(
            "block {} does not lie under the descriptor's directory {}",
            path.display(),
            base.display()
        )
    })?;
    relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part
                .to_str()
                .ok_or_else(|| trimat_err!("block path {} is not valid UTF-8", path.display())),
            _ => Err(trimat_err!("block path {} is not normalized", path.display())),
        })
        .collect::<TrimatResult<Vec<_>>>()
        .map(|parts| parts.join("/"))
}
