use arrow_buffer::BooleanBuffer;
use trimat_error::{TrimatResult, trimat_bail};

use crate::Mask;

impl Mask {
    /// Build a mask of `len` positions by repeating `pattern` end-to-end.
    ///
    /// The pattern does not need to divide `len`; the last repetition is truncated. A pattern
    /// longer than `len` is rejected, as is an empty pattern for a non-empty axis.
    pub fn recycle(pattern: &[bool], len: usize) -> TrimatResult<Self> {
        if pattern.len() > len {
            trimat_bail!(
                InvalidSelector: "mask of length {} is longer than the axis of length {}",
                pattern.len(),
                len
            );
        }
        if pattern.is_empty() {
            if len == 0 {
                return Ok(Self::new_false(0));
            }
            trimat_bail!(InvalidSelector: "cannot recycle an empty mask to length {}", len);
        }
        if pattern.len() == len {
            return Ok(Self::from_iter(pattern.iter().copied()));
        }

        let period = pattern.len();
        Ok(Self::from_buffer(BooleanBuffer::collect_bool(len, |idx| {
            pattern[idx % period]
        })))
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use crate::Mask;

    #[rstest]
    #[case(&[true], 4, vec![1, 2, 3, 4])]
    #[case(&[false], 4, vec![])]
    #[case(&[true, false], 5, vec![1, 3, 5])]
    #[case(&[false, true, true], 7, vec![2, 3, 5, 6])]
    #[case(&[true, false, false, true], 4, vec![1, 4])]
    fn recycles_pattern(#[case] pattern: &[bool], #[case] len: usize, #[case] expected: Vec<usize>) {
        let mask = Mask::recycle(pattern, len).unwrap();
        assert_eq!(mask.true_count(), expected.len());
        assert_eq!(mask.to_positions(1), expected);
    }

    #[test]
    fn rejects_empty_pattern() {
        assert!(Mask::recycle(&[], 3).is_err());
        assert!(matches!(Mask::recycle(&[], 0).unwrap(), Mask::AllFalse(0)));
    }

    #[test]
    fn rejects_overlong_pattern() {
        assert!(Mask::recycle(&[true, true, false], 2).is_err());
    }
}
