use std::fs::File;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use memmap2::Mmap;
use trimat_error::{TrimatResult, trimat_bail, trimat_err};

use crate::{EOF_SIZE, EndOfFile, EntrySpec, Footer, MmapBlock};

/// An opened block file: its bytes and its decoded footer.
///
/// Opening only parses the footer. Cell reads go straight to the mapped pages.
#[derive(Debug, Clone)]
pub struct BlockFile {
    path: PathBuf,
    bytes: Bytes,
    footer: Footer,
}

impl BlockFile {
    /// Memory-map and open the block file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> TrimatResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| trimat_err!(IOError: e).with_context(format!("opening {}", path.display())))?;
        // SAFETY: block files are never mutated after they are written.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_bytes(path, Bytes::from_owner(mmap))
    }

    /// Open a block file from bytes that are already in memory. `path` is only used to name the
    /// file in errors.
    pub fn from_bytes<P: AsRef<Path>>(path: P, bytes: Bytes) -> TrimatResult<Self> {
        let path = path.as_ref().to_path_buf();
        let eof = EndOfFile::parse(&bytes)
            .map_err(|e| e.with_context(format!("reading {}", path.display())))?;

        let footer_end = bytes.len() - EOF_SIZE;
        let footer_length = usize::try_from(eof.footer_length)
            .map_err(|_| trimat_err!(InvalidSerde: "footer of {} bytes does not fit in memory", eof.footer_length))?;
        if footer_length > footer_end {
            trimat_bail!(
                InvalidSerde: "{} declares a footer of {} bytes but only {} precede the end-of-file marker",
                path.display(),
                footer_length,
                footer_end
            );
        }
        let data_end = footer_end - footer_length;
        let footer = Footer::from_bytes(&bytes[data_end..footer_end])
            .map_err(|e| e.with_context(format!("reading {}", path.display())))?;
        for entry in footer.entries() {
            entry
                .validate(data_end as u64)
                .map_err(|e| e.with_context(format!("reading {}", path.display())))?;
        }

        log::trace!(
            "opened block file {} with {} entries",
            path.display(),
            footer.entries().len()
        );
        Ok(Self {
            path,
            bytes,
            footer,
        })
    }

    /// The path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The decoded footer.
    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// The single matrix entry of the file, as a block handle.
    ///
    /// Fails with [`Ambiguous`](trimat_error::TrimatError::Ambiguous) unless the file declares
    /// exactly one matrix entry.
    pub fn block(&self) -> TrimatResult<MmapBlock> {
        let entry = self.footer.matrix_entry(&self.path)?;
        Ok(MmapBlock::new(self.entry_bytes(entry), entry))
    }

    /// The matrix entry with the given name, as a block handle.
    pub fn block_named(&self, name: &str) -> TrimatResult<MmapBlock> {
        match self.footer.entry(name) {
            Some(entry) if entry.is_matrix() => Ok(MmapBlock::new(self.entry_bytes(entry), entry)),
            Some(_) => trimat_bail!("entry {} of {} is not a matrix", name, self.path.display()),
            None => trimat_bail!("{} has no entry named {}", self.path.display(), name),
        }
    }

    /// The bytes of the named attachment, if present.
    pub fn attachment(&self, name: &str) -> Option<Bytes> {
        self.footer
            .entry(name)
            .filter(|e| !e.is_matrix())
            .map(|e| self.entry_bytes(e))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn entry_bytes(&self, entry: &EntrySpec) -> Bytes {
        // Entries were validated against the data section on open.
        let start = entry.offset as usize;
        self.bytes.slice(start..start + entry.length as usize)
    }
}
