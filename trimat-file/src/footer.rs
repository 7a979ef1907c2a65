use std::path::Path;

use serde::{Deserialize, Serialize};
use trimat_error::{TrimatResult, trimat_bail, trimat_err};

use crate::{EOF_SIZE, MAGIC_BYTES, PAYLOAD_ALIGNMENT, VERSION};

/// What an entry of a block file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Row-major little-endian `f64` cells.
    Matrix,
    /// Opaque bytes that are carried alongside the block but never read as one.
    Attachment,
}

/// The declaration of one entry in a block file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySpec {
    /// A name unique within the file.
    pub name: String,
    /// How to interpret the entry's bytes.
    pub kind: EntryKind,
    /// Byte offset of the payload from the start of the file.
    pub offset: u64,
    /// Payload length in bytes.
    pub length: u64,
    /// Row count, for matrices.
    pub rows: u64,
    /// Column count, for matrices.
    pub cols: u64,
    /// Row labels, for labelled matrices.
    pub row_labels: Option<Vec<String>>,
    /// Column labels, for labelled matrices.
    pub col_labels: Option<Vec<String>>,
}

impl EntrySpec {
    /// Whether the entry declares a matrix.
    pub fn is_matrix(&self) -> bool {
        self.kind == EntryKind::Matrix
    }

    /// Check that a matrix entry's shape, labels and payload agree with each other and fit
    /// within the first `data_end` bytes of the file.
    pub(crate) fn validate(&self, data_end: u64) -> TrimatResult<()> {
        let end = self
            .offset
            .checked_add(self.length)
            .ok_or_else(|| trimat_err!(InvalidSerde: "entry {} overflows u64", self.name))?;
        if end > data_end {
            trimat_bail!(
                InvalidSerde: "entry {} spans bytes {}..{} beyond the data section of {} bytes",
                self.name,
                self.offset,
                end,
                data_end
            );
        }
        if !self.is_matrix() {
            return Ok(());
        }

        if self.offset % PAYLOAD_ALIGNMENT as u64 != 0 {
            trimat_bail!(InvalidSerde: "matrix entry {} is not 8-byte aligned", self.name);
        }
        let cells = self
            .rows
            .checked_mul(self.cols)
            .and_then(|cells| cells.checked_mul(size_of::<f64>() as u64))
            .ok_or_else(|| trimat_err!(InvalidSerde: "entry {} shape overflows", self.name))?;
        if cells != self.length {
            trimat_bail!(
                InvalidSerde: "matrix entry {} declares {}x{} but holds {} bytes",
                self.name,
                self.rows,
                self.cols,
                self.length
            );
        }
        if let Some(labels) = &self.row_labels {
            if labels.len() as u64 != self.rows {
                trimat_bail!(
                    InvalidSerde: "matrix entry {} has {} row labels for {} rows",
                    self.name,
                    labels.len(),
                    self.rows
                );
            }
        }
        if let Some(labels) = &self.col_labels {
            if labels.len() as u64 != self.cols {
                trimat_bail!(
                    InvalidSerde: "matrix entry {} has {} column labels for {} columns",
                    self.name,
                    labels.len(),
                    self.cols
                );
            }
        }
        Ok(())
    }
}

/// The entry table of a block file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    entries: Vec<EntrySpec>,
}

impl Footer {
    pub(crate) fn new(entries: Vec<EntrySpec>) -> Self {
        Self { entries }
    }

    /// All declared entries, in write order.
    pub fn entries(&self) -> &[EntrySpec] {
        &self.entries
    }

    /// The entry with the given name.
    pub fn entry(&self, name: &str) -> Option<&EntrySpec> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// The single matrix entry of the file.
    ///
    /// Fails with [`Ambiguous`](trimat_error::TrimatError::Ambiguous) when the file declares no
    /// matrix or more than one.
    pub fn matrix_entry(&self, path: &Path) -> TrimatResult<&EntrySpec> {
        let mut matrices = self.entries.iter().filter(|e| e.is_matrix());
        match (matrices.next(), matrices.next()) {
            (Some(entry), None) => Ok(entry),
            (None, _) => trimat_bail!(
                Ambiguous: "block file {} declares no matrix entry",
                path.display()
            ),
            (Some(_), Some(_)) => trimat_bail!(
                Ambiguous: "block file {} declares {} matrix entries, expected exactly one",
                path.display(),
                self.entries.iter().filter(|e| e.is_matrix()).count()
            ),
        }
    }

    pub(crate) fn to_bytes(&self) -> TrimatResult<Vec<u8>> {
        flexbuffers::to_vec(self)
            .map_err(|e| trimat_err!(InvalidSerde: "failed to encode block file footer: {}", e))
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> TrimatResult<Self> {
        flexbuffers::from_slice(bytes)
            .map_err(|e| trimat_err!(InvalidSerde: "failed to decode block file footer: {}", e))
    }
}

/// The trailing marker of a block file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EndOfFile {
    pub(crate) version: u16,
    pub(crate) footer_length: u32,
}

impl EndOfFile {
    pub(crate) fn to_bytes(self) -> [u8; EOF_SIZE] {
        let mut eof = [0u8; EOF_SIZE];
        eof[0..2].copy_from_slice(&self.version.to_le_bytes());
        // bytes 2..4 are reserved and stay zero
        eof[4..8].copy_from_slice(&self.footer_length.to_le_bytes());
        eof[8..12].copy_from_slice(&MAGIC_BYTES);
        eof
    }

    pub(crate) fn parse(bytes: &[u8]) -> TrimatResult<Self> {
        if bytes.len() < EOF_SIZE {
            trimat_bail!(
                InvalidSerde: "block file is {} bytes, shorter than its end-of-file marker",
                bytes.len()
            );
        }
        let eof = &bytes[bytes.len() - EOF_SIZE..];
        if eof[8..12] != MAGIC_BYTES {
            trimat_bail!(InvalidSerde: "not a block file: bad magic bytes {:?}", &eof[8..12]);
        }
        let version = u16::from_le_bytes([eof[0], eof[1]]);
        if version != VERSION {
            trimat_bail!(InvalidSerde: "unsupported block file version {}", version);
        }
        if eof[2..4] != [0u8, 0u8] {
            trimat_bail!(InvalidSerde: "reserved end-of-file bytes must be zero");
        }
        let footer_length = u32::from_le_bytes([eof[4], eof[5], eof[6], eof[7]]);
        Ok(Self {
            version,
            footer_length,
        })
    }
}
