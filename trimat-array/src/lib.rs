#![deny(missing_docs)]

//! Dense matrices and the storage capabilities the block layout is built on.
//!
//! A [`BlockHandle`] is read access to one rectangular block, wherever it lives. A
//! [`BlockStore`] persists blocks under local paths and reopens them. [`DenseMatrix`] is the
//! owned, in-memory matrix that flows in and out of both.

mod handle;
mod matrix;
mod memory;
mod store;

pub use handle::*;
pub use matrix::{DenseMatrix, Labels, check_range};
pub use memory::*;
pub use store::*;
