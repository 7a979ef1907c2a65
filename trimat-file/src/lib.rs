//! Read and write Trimat block files.
//!
//! A block file holds the values of one rectangular block of a larger matrix, stored so that it
//! can be memory-mapped and read cell by cell without decoding the whole file.
//!
//! # File Format
//!
//! 1. Entry payloads are written first. A matrix entry is its row-major `f64` values in
//!    little-endian order, starting on an 8-byte boundary. Attachment entries are opaque bytes.
//! 2. The footer follows: a flexbuffer-encoded [`Footer`] that declares every entry by name, kind,
//!    offset and (for matrices) shape and labels.
//! 3. The file ends with a 12-byte end-of-file marker: the `u16` format version, a reserved `u16`,
//!    the `u32` footer length and 4 magic bytes.
//!
//! ## Illustrated File Format
//! ```text
//! ┌────────────────────────────┐
//! │      Entry payloads        │
//! │  (f64 LE, 8-byte aligned)  │
//! ├────────────────────────────┤
//! │     Footer Flexbuffer      │
//! │    (entry declarations)    │
//! ├────────────────────────────┤
//! │    12-byte End of File     │
//! │ (Version, Reserved, Footer │
//! │    Length, Magic Bytes)    │
//! └────────────────────────────┘
//! ```
//!
//! A file opened as a block must declare exactly one matrix entry; anything else is ambiguous
//! and rejected.

mod file;
mod footer;
mod mmap;
mod store;
mod writer;

pub use file::*;
pub use footer::*;
pub use forever_constant::*;
pub use mmap::*;
pub use store::*;
pub use writer::*;

/// The current version of the block file format.
pub const VERSION: u16 = 1;

/// The name given to the matrix entry of files written by [`FileBlockStore`].
pub const BLOCK_ENTRY_NAME: &str = "block";

/// Constants that will never change (i.e., doing so would break backwards compatibility)
mod forever_constant {
    /// The extension for block files
    pub const BLOCK_FILE_EXTENSION: &str = "trmb";

    /// The magic bytes for a block file
    pub const MAGIC_BYTES: [u8; 4] = *b"TRMB";
    /// The size of the EOF marker in bytes
    pub const EOF_SIZE: usize = 12;
    /// The alignment of matrix payloads in bytes
    pub const PAYLOAD_ALIGNMENT: usize = 8;

}
