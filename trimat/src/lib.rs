pub use trimat_layout::*;
pub use {
    trimat_array as array, trimat_error as error, trimat_file as file, trimat_layout as layout,
    trimat_mask as mask,
};

#[cfg(test)]
mod tests {
    use crate::array::DenseMatrix;
    use crate::{BlockLayout, BuildOptions, MatrixBuilder, Selector};

    #[test]
    fn build_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("kinship");
        let dense = DenseMatrix::from_fn(6, 6, |i, j| (i + j) as f64);
        MatrixBuilder::new(BuildOptions::default().with_block_size(4))
            .build(&dense, &root)
            .unwrap();

        let layout = BlockLayout::open(root.join("layout.json")).unwrap();
        assert_eq!(layout.block_count(), 2);
        assert_eq!(
            layout.get_matrix(Selector::All, Selector::All).unwrap(),
            dense
        );
    }
}
