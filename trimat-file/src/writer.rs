use std::io::Write;

use trimat_array::DenseMatrix;
use trimat_error::{TrimatResult, trimat_bail, trimat_err};

use crate::{EndOfFile, EntryKind, EntrySpec, Footer, PAYLOAD_ALIGNMENT, VERSION};

/// Streams entries into a block file, then appends the footer and end-of-file marker.
///
/// Most callers want exactly one matrix entry per file, which is what
/// [`FileBlockStore`](crate::FileBlockStore) writes. The writer itself allows any number of
/// entries so that attachments can ride along with a block.
pub struct BlockFileWriter<W> {
    write: W,
    position: u64,
    entries: Vec<EntrySpec>,
}

impl<W: Write> BlockFileWriter<W> {
    /// Start a new block file on `write`, which must be positioned at the start of the file.
    pub fn new(write: W) -> Self {
        Self {
            write,
            position: 0,
            entries: Vec::new(),
        }
    }

    /// Append a matrix entry holding the cells and labels of `matrix`.
    pub fn push_matrix(&mut self, name: &str, matrix: &DenseMatrix) -> TrimatResult<&mut Self> {
        self.check_name(name)?;
        self.pad()?;

        let offset = self.position;
        for value in matrix.values() {
            self.write_all(&value.to_le_bytes())?;
        }

        self.entries.push(EntrySpec {
            name: name.to_string(),
            kind: EntryKind::Matrix,
            offset,
            length: self.position - offset,
            rows: matrix.rows() as u64,
            cols: matrix.cols() as u64,
            row_labels: matrix.row_labels().map(<[String]>::to_vec),
            col_labels: matrix.col_labels().map(<[String]>::to_vec),
        });
        Ok(self)
    }

    /// Append an opaque attachment.
    pub fn push_attachment(&mut self, name: &str, bytes: &[u8]) -> TrimatResult<&mut Self> {
        self.check_name(name)?;
        let offset = self.position;
        self.write_all(bytes)?;
        self.entries.push(EntrySpec {
            name: name.to_string(),
            kind: EntryKind::Attachment,
            offset,
            length: bytes.len() as u64,
            rows: 0,
            cols: 0,
            row_labels: None,
            col_labels: None,
        });
        Ok(self)
    }

    /// Write the footer and end-of-file marker, returning the underlying writer.
    pub fn finish(mut self) -> TrimatResult<W> {
        let footer = Footer::new(std::mem::take(&mut self.entries)).to_bytes()?;
        let footer_length = u32::try_from(footer.len()).map_err(|_| {
            trimat_err!(InvalidSerde: "block file footer of {} bytes is too large", footer.len())
        })?;
        self.write_all(&footer)?;
        self.write_all(
            &EndOfFile {
                version: VERSION,
                footer_length,
            }
            .to_bytes(),
        )?;
        self.write.flush()?;
        Ok(self.write)
    }

    fn check_name(&self, name: &str) -> TrimatResult<()> {
        if self.entries.iter().any(|e| e.name == name) {
            trimat_bail!("block file already has an entry named {}", name);
        }
        Ok(())
    }

    /// Zero-pad up to the next payload boundary.
    #[allow(clippy::cast_possible_truncation)]
    fn pad(&mut self) -> TrimatResult<()> {
        let alignment = PAYLOAD_ALIGNMENT as u64;
        let padding = (alignment - self.position % alignment) % alignment;
        if padding > 0 {
            self.write_all(&[0u8; PAYLOAD_ALIGNMENT][..padding as usize])?;
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> TrimatResult<()> {
        self.write.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }
}
