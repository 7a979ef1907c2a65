#![deny(missing_docs)]

//! Block-triangular layouts over large symmetric matrices.
//!
//! A [`BlockLayout`] partitions an `n x n` symmetric matrix into a `q x q` grid of blocks and keeps
//! only the diagonal and upper-triangular ones, each behind its own
//! [`BlockHandle`](trimat_array::BlockHandle). Reads accept row and column [`Selector`]s (all,
//! masks, 1-based positions or labels), mirror every lower-triangle cell into the stored upper
//! triangle, and fetch each touched block once.
//!
//! Layouts are created by a [`MatrixBuilder`], which writes blocks and a [`LayoutDescriptor`]
//! into a new directory, or reopened with [`BlockLayout::open`] and
//! [`BlockLayout::from_block_files`].

mod builder;
mod descriptor;
mod layout;
mod naming;
mod reconstitute;
mod retrieve;
mod selector;
mod triangular;
mod validate;

pub use builder::*;
pub use descriptor::{BlockDescriptor, DESCRIPTOR_VERSION, LayoutDescriptor};
pub use layout::*;
pub use naming::*;
pub use retrieve::*;
pub use selector::*;
pub use triangular::*;
pub use validate::{ValidatedLayout, validate, validate_triangle};
