use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};
use tempfile::TempDir;
use trimat_array::{BlockHandle, DenseMatrix};
use trimat_error::TrimatError;
use trimat_file::BlockFileWriter;
use trimat_layout::{BlockLayout, BuildOptions, MatrixBuilder, Retrieved, Selector};

/// A symmetric `n x n` matrix labelled `ID_1..ID_n` with distinct values above the diagonal.
fn symmetric(n: usize) -> DenseMatrix {
    DenseMatrix::from_fn(n, n, |i, j| {
        let (lo, hi) = (i.min(j) as f64, i.max(j) as f64);
        lo * 1000.0 + hi + 0.25
    })
    .with_labels((1..=n).map(|i| format!("ID_{i}")).collect::<Vec<_>>())
    .unwrap()
}

fn build(dense: &DenseMatrix, block_size: usize, dir: &Path) -> BlockLayout {
    MatrixBuilder::new(BuildOptions::default().with_block_size(block_size))
        .build(dense, dir)
        .unwrap()
}

struct Built {
    _dir: TempDir,
    root: PathBuf,
    dense: DenseMatrix,
    layout: BlockLayout,
}

#[fixture]
fn ten_by_four() -> Built {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ten");
    let dense = symmetric(10);
    let layout = build(&dense, 4, &root);
    Built {
        _dir: dir,
        root,
        dense,
        layout,
    }
}

/// The block files of a built layout in canonical order.
fn block_files(layout: &BlockLayout) -> Vec<PathBuf> {
    layout.sources().unwrap().cells().to_vec()
}

#[rstest]
fn scenario_geometry(ten_by_four: Built) {
    let layout = &ten_by_four.layout;
    assert_eq!(layout.block_count(), 3);
    assert_eq!(layout.block_size(false), 4);
    assert_eq!(layout.block_size(true), 2);
    assert_eq!(layout.dimension(), (10, 10));
    assert_eq!(
        layout.labels().unwrap(),
        ten_by_four.dense.col_labels().unwrap()
    );
}

#[rstest]
fn scenario_top_left_block(ten_by_four: Built) {
    let got = ten_by_four.layout.get_matrix([1usize, 2], [1usize, 2]).unwrap();
    assert_eq!(got, ten_by_four.dense.slice(0..2, 0..2).unwrap());
}

#[rstest]
fn scenario_labels_equal_positions(ten_by_four: Built) {
    let by_label = ten_by_four
        .layout
        .get_matrix(["ID_1", "ID_2"], ["ID_1", "ID_2"])
        .unwrap();
    let by_position = ten_by_four.layout.get_matrix([1usize, 2], [1usize, 2]).unwrap();
    assert_eq!(by_label, by_position);
}

#[rstest]
fn scenario_flat_subscript(ten_by_four: Built) {
    assert_eq!(
        ten_by_four.layout.get_flat(11usize).unwrap(),
        vec![ten_by_four.dense.value(0, 1)]
    );
}

#[rstest]
fn scenario_reassemble_from_files(ten_by_four: Built) {
    let files = block_files(&ten_by_four.layout);
    assert_eq!(files.len(), 6);
    assert_eq!(
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect::<Vec<_>>(),
        [
            "data_1_1.trmb",
            "data_1_2.trmb",
            "data_1_3.trmb",
            "data_2_2.trmb",
            "data_2_3.trmb",
            "data_3_3.trmb"
        ]
    );

    let reassembled = BlockLayout::from_block_files(&files, vec![], vec![]).unwrap();
    assert_eq!(
        reassembled.get_matrix(Selector::All, Selector::All).unwrap(),
        ten_by_four.dense
    );

    let err = BlockLayout::from_block_files(&files[..5], vec![], vec![]).unwrap_err();
    assert!(matches!(err, TrimatError::InvalidShape(..)));
}

#[rstest]
fn scenario_two_matrices_in_one_file(ten_by_four: Built) {
    let mut files = block_files(&ten_by_four.layout);
    let doubled = ten_by_four.root.join("doubled.trmb");
    let mut writer = BlockFileWriter::new(BufWriter::new(File::create(&doubled).unwrap()));
    writer
        .push_matrix("block", &ten_by_four.dense.slice(8..10, 8..10).unwrap())
        .unwrap()
        .push_matrix("copy", &ten_by_four.dense.slice(8..10, 8..10).unwrap())
        .unwrap();
    writer.finish().unwrap().flush().unwrap();
    files[5] = doubled;

    let err = BlockLayout::from_block_files(&files, vec![], vec![]).unwrap_err();
    assert!(matches!(err.root(), TrimatError::Ambiguous(..)));
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(4)]
#[case(7)]
#[case(10)]
#[case(25)]
fn dense_equivalence(#[case] block_size: usize) {
    let dir = tempfile::tempdir().unwrap();
    let dense = symmetric(10);
    let layout = build(&dense, block_size, &dir.path().join("layout"));

    assert_eq!(layout.block_count(), 10usize.div_ceil(block_size));
    assert_eq!(
        layout.block_size(true),
        10 - layout.block_size(false) * (layout.block_count() - 1)
    );
    assert_eq!(layout.get_matrix(Selector::All, Selector::All).unwrap(), dense);

    let rows = vec![10usize, 3, 3, 1];
    let cols = vec![2usize, 9, 10];
    let got = layout.get_matrix(rows.clone(), cols.clone()).unwrap();
    for (a, &i) in rows.iter().enumerate() {
        for (b, &j) in cols.iter().enumerate() {
            assert_eq!(got.value(a, b), dense.value(i - 1, j - 1));
        }
    }
}

#[rstest]
fn boundary_cells(ten_by_four: Built) {
    let layout = &ten_by_four.layout;
    for (i, j) in [(8, 9), (9, 8), (9, 10), (10, 10), (4, 5), (5, 4), (1, 10), (10, 1)] {
        assert_eq!(
            layout.element(i, j).unwrap(),
            ten_by_four.dense.value(i - 1, j - 1),
            "({i}, {j})"
        );
    }
}

#[rstest]
fn drop_semantics(ten_by_four: Built) {
    let layout = &ten_by_four.layout;
    let dropped = layout.get(5usize, 1..=10usize, true).unwrap();
    assert!(matches!(&dropped, Retrieved::Vector(values) if values.len() == 10));

    let kept = layout.get([5usize], 1..=10usize, false).unwrap().into_matrix().unwrap();
    assert_eq!(kept.shape(), (1, 10));
    assert_eq!(kept.values(), dropped.values());
}

#[rstest]
fn descriptor_round_trip_after_relocation(ten_by_four: Built) {
    let moved = ten_by_four.root.with_file_name("moved");
    std::fs::rename(&ten_by_four.root, &moved).unwrap();

    let reopened = BlockLayout::open(moved.join("layout.json")).unwrap();
    assert_eq!(reopened.dimension(), (10, 10));
    assert_eq!(reopened.block_size(true), 2);
    assert_eq!(
        reopened.get_matrix(Selector::All, Selector::All).unwrap(),
        ten_by_four.dense
    );
}

#[test]
fn centers_and_scales_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("scaled");
    let dense = symmetric(5);
    let centers = vec![0.5, 1.5, 2.5, 3.5, 4.5];
    let scales = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    MatrixBuilder::new(BuildOptions::default().with_block_size(2))
        .build_scaled(&dense, centers.clone(), scales.clone(), &root)
        .unwrap();

    let reopened = BlockLayout::open(root.join("layout.json")).unwrap();
    assert_eq!(reopened.centers(), centers.as_slice());
    assert_eq!(reopened.scales(), scales.as_slice());
}

#[rstest]
fn reassembled_layout_can_save_a_descriptor(ten_by_four: Built) {
    let files = block_files(&ten_by_four.layout);
    let reassembled = BlockLayout::from_block_files(&files, vec![], vec![]).unwrap();

    let descriptor = ten_by_four.root.join("again.json");
    reassembled.save_descriptor(&descriptor).unwrap();
    let reopened = BlockLayout::open(&descriptor).unwrap();
    assert_eq!(
        reopened.get_matrix(Selector::All, Selector::All).unwrap(),
        ten_by_four.dense
    );
}

#[rstest]
fn existing_target_is_an_io_error(ten_by_four: Built) {
    let err = MatrixBuilder::new(BuildOptions::default().with_block_size(4))
        .build(&ten_by_four.dense, &ten_by_four.root)
        .unwrap_err();
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::AlreadyExists));
}

#[rstest]
fn missing_block_file_fails_reopening(ten_by_four: Built) {
    std::fs::remove_file(ten_by_four.root.join("data_2_3.trmb")).unwrap();
    let err = BlockLayout::open(ten_by_four.root.join("layout.json")).unwrap_err();
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
}

#[rstest]
fn reblocking_from_a_layout(ten_by_four: Built) {
    let target = ten_by_four.root.with_file_name("reblocked");
    let reblocked = MatrixBuilder::new(BuildOptions::default().with_block_size(3))
        .build(&ten_by_four.layout, &target)
        .unwrap();

    assert_eq!(reblocked.block_count(), 4);
    assert_eq!(reblocked.block_size(true), 1);
    assert_eq!(reblocked.labels(), ten_by_four.layout.labels());
    assert_eq!(
        reblocked.read_submatrix(0..10, 0..10).unwrap(),
        ten_by_four.dense
    );
}

#[test]
fn custom_names() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("named");
    let options = BuildOptions::default()
        .with_block_size(1)
        .with_file_prefix("ld")
        .with_descriptor_name("meta.json");
    let layout = MatrixBuilder::new(options)
        .build(&symmetric(10), &root)
        .unwrap();

    assert_eq!(layout.block_count(), 10);
    assert!(root.join("ld_01_10.trmb").exists());
    assert!(root.join("ld_10_10.trmb").exists());
    assert!(root.join("meta.json").exists());
}
