use std::ops::RangeInclusive;

use rustc_hash::FxHashMap;
use trimat_array::Labels;
use trimat_error::{TrimatResult, trimat_bail, trimat_err};
use trimat_mask::Mask;

/// Selects positions along one axis of a layout. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// Every position, in order.
    #[default]
    All,
    /// The positions where the mask is true. Masks shorter than the axis are recycled.
    Mask(Vec<bool>),
    /// Explicit positions, in any order, duplicates allowed.
    Positions(Vec<usize>),
    /// Positions looked up by label, in any order, duplicates allowed.
    Labels(Vec<String>),
}

impl Selector {
    /// Select a single position.
    pub fn position(position: usize) -> Self {
        Self::Positions(vec![position])
    }

    /// Select a single label.
    pub fn label<S: Into<String>>(label: S) -> Self {
        Self::Labels(vec![label.into()])
    }

    /// Resolve against an axis of length `len`, keeping unmatched labels as `None`.
    ///
    /// Fails with [`OutOfBounds`](trimat_error::TrimatError::OutOfBounds) for a position outside
    /// `1..=len`, [`MissingLabels`](trimat_error::TrimatError::MissingLabels) for a label selector
    /// on an unlabelled axis, and [`InvalidSelector`](trimat_error::TrimatError::InvalidSelector)
    /// for a mask that cannot be recycled to `len`.
    pub fn resolve(&self, len: usize, labels: Option<&LabelIndex>) -> TrimatResult<Vec<Option<usize>>> {
        match self {
            Self::All => Ok((1..=len).map(Some).collect()),
            Self::Mask(pattern) => Ok(Mask::recycle(pattern, len)?
                .to_positions(1)
                .into_iter()
                .map(Some)
                .collect()),
            Self::Positions(positions) => positions
                .iter()
                .map(|&position| check_position(position, len).map(Some))
                .collect(),
            Self::Labels(names) => {
                let Some(labels) = labels else {
                    trimat_bail!(MissingLabels: "cannot select by label: the layout has no labels");
                };
                Ok(names.iter().map(|name| labels.position(name)).collect())
            }
        }
    }

    /// Resolve against an axis of length `len`, failing with
    /// [`UnknownLabel`](trimat_error::TrimatError::UnknownLabel) if any label is unmatched.
    pub fn positions(&self, len: usize, labels: Option<&LabelIndex>) -> TrimatResult<Vec<usize>> {
        let resolved = self.resolve(len, labels)?;
        resolved
            .iter()
            .enumerate()
            .map(|(idx, position)| {
                position.ok_or_else(|| match self {
                    Self::Labels(names) => trimat_err!(UnknownLabel: "no row or column is labelled {:?}", names[idx]),
                    _ => trimat_err!(UnknownLabel: "unresolved position at selector index {}", idx),
                })
            })
            .collect()
    }

    /// Resolve against the flattened, column-major `len * len` index space, returning one
    /// `(row, col)` pair per selected flat position.
    ///
    /// Flat position `k` maps to `row = ((k - 1) mod len) + 1` and `col = ((k - 1) div len) + 1`.
    pub fn flat_pairs(&self, len: usize) -> TrimatResult<Vec<(usize, usize)>> {
        let cells = len
            .checked_mul(len)
            .ok_or_else(|| trimat_err!("a {}x{} layout overflows the flat index space", len, len))?;
        if let Self::Labels(_) = self {
            trimat_bail!(InvalidSelector: "labels cannot select from the flattened index space");
        }
        Ok(self
            .positions(cells, None)?
            .into_iter()
            .map(|k| ((k - 1) % len + 1, (k - 1) / len + 1))
            .collect())
    }
}

fn check_position(position: usize, len: usize) -> TrimatResult<usize> {
    if position == 0 || position > len {
        trimat_bail!(OutOfBounds: position, 1, len);
    }
    Ok(position)
}

impl From<Vec<usize>> for Selector {
    fn from(positions: Vec<usize>) -> Self {
        Self::Positions(positions)
    }
}

impl From<&[usize]> for Selector {
    fn from(positions: &[usize]) -> Self {
        Self::Positions(positions.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Selector {
    fn from(positions: [usize; N]) -> Self {
        Self::Positions(positions.to_vec())
    }
}

impl From<usize> for Selector {
    fn from(position: usize) -> Self {
        Self::position(position)
    }
}

impl From<RangeInclusive<usize>> for Selector {
    fn from(positions: RangeInclusive<usize>) -> Self {
        Self::Positions(positions.collect())
    }
}

impl From<Vec<bool>> for Selector {
    fn from(mask: Vec<bool>) -> Self {
        Self::Mask(mask)
    }
}

impl<const N: usize> From<[bool; N]> for Selector {
    fn from(mask: [bool; N]) -> Self {
        Self::Mask(mask.to_vec())
    }
}

impl From<Vec<String>> for Selector {
    fn from(labels: Vec<String>) -> Self {
        Self::Labels(labels)
    }
}

impl From<&[&str]> for Selector {
    fn from(labels: &[&str]) -> Self {
        Self::Labels(labels.iter().map(|l| (*l).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(labels: [&str; N]) -> Self {
        Self::Labels(labels.iter().map(|l| (*l).to_string()).collect())
    }
}

impl From<&str> for Selector {
    fn from(label: &str) -> Self {
        Self::label(label)
    }
}

/// Axis labels with a lookup from label to 1-based position.
///
/// When a label repeats, lookups resolve to its first position.
#[derive(Debug, Clone)]
pub struct LabelIndex {
    labels: Labels,
    positions: FxHashMap<String, usize>,
}

impl LabelIndex {
    /// Index the given labels.
    pub fn new(labels: Labels) -> Self {
        let mut positions = FxHashMap::with_capacity_and_hasher(labels.len(), Default::default());
        for (idx, label) in labels.iter().enumerate() {
            positions.entry(label.clone()).or_insert(idx + 1);
        }
        Self { labels, positions }
    }

    /// The labels, in axis order.
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// The 1-based position of `label`, if present.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// The labels at the given 1-based positions.
    pub(crate) fn select(&self, positions: &[usize]) -> Labels {
        positions.iter().map(|&p| self.labels[p - 1].clone()).collect()
    }
}
