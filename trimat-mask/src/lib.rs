//! A mask selects a subset of positions along one axis of a matrix.
//!
//! Masks are built from boolean patterns, which may be shorter than the axis they select from.
//! Such patterns are recycled: repeated end-to-end until they cover the axis, with the final
//! repetition truncated if the axis length is not a multiple of the pattern length.
#![deny(missing_docs)]
mod recycle;

use std::sync::Arc;

use arrow_buffer::BooleanBuffer;

/// A selection over the positions of an axis.
///
/// The all-true and all-false cases are kept symbolic so that selecting a full axis never
/// materializes a buffer.
#[derive(Clone, Debug)]
pub enum Mask {
    /// All of the given number of positions are selected.
    AllTrue(usize),
    /// None of the given number of positions are selected.
    AllFalse(usize),
    /// Some positions are selected.
    Values(Arc<MaskValues>),
}

/// The bits of a [`Mask`] that selects some but not all positions.
#[derive(Debug)]
pub struct MaskValues {
    buffer: BooleanBuffer,
    true_count: usize,
}

impl Mask {
    /// A mask of `len` positions, none selected.
    pub fn new_false(len: usize) -> Self {
        Self::AllFalse(len)
    }

    /// Wrap a [`BooleanBuffer`], collapsing uniform buffers to their symbolic form.
    pub fn from_buffer(buffer: BooleanBuffer) -> Self {
        let len = buffer.len();
        let true_count = buffer.count_set_bits();
        match true_count {
            0 => Self::AllFalse(len),
            count if count == len => Self::AllTrue(len),
            _ => Self::Values(Arc::new(MaskValues { buffer, true_count })),
        }
    }

    /// The number of selected positions.
    pub fn true_count(&self) -> usize {
        match self {
            Self::AllTrue(len) => *len,
            Self::AllFalse(_) => 0,
            Self::Values(values) => values.true_count,
        }
    }

    /// The selected positions in ascending order, shifted by `base`.
    ///
    /// Passing `base = 1` yields the 1-based positions used by matrix selectors.
    pub fn to_positions(&self, base: usize) -> Vec<usize> {
        let mut positions = Vec::with_capacity(self.true_count());
        match self {
            Self::AllTrue(len) => positions.extend(base..base + len),
            Self::AllFalse(_) => {}
            Self::Values(values) => {
                positions.extend(values.buffer.set_indices().map(|idx| idx + base));
            }
        }
        positions
    }
}

impl FromIterator<bool> for Mask {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Self::from_buffer(BooleanBuffer::from_iter(iter))
    }
}
