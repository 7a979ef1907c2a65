use std::fs::File;
use std::io::{BufWriter, Write};

use rstest::rstest;
use trimat_array::{BlockHandle, BlockStore, DenseMatrix};
use trimat_error::TrimatError;
use trimat_file::{BLOCK_FILE_EXTENSION, BlockFile, BlockFileWriter, FileBlockStore};

fn labelled(rows: usize, cols: usize) -> DenseMatrix {
    DenseMatrix::from_fn(rows, cols, |r, c| (r as f64) - (c as f64) / 10.0)
        .with_row_labels((0..rows).map(|r| format!("r{r}")).collect::<Vec<_>>())
        .unwrap()
        .with_col_labels((0..cols).map(|c| format!("c{c}")).collect::<Vec<_>>())
        .unwrap()
}

#[rstest]
#[case(1, 1)]
#[case(4, 4)]
#[case(3, 7)]
#[case(0, 0)]
fn store_preserves_values_and_labels(#[case] rows: usize, #[case] cols: usize) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join(format!("data_1_2.{BLOCK_FILE_EXTENSION}"));
    let matrix = labelled(rows, cols);

    FileBlockStore.write(&path, &matrix).unwrap();
    let block = FileBlockStore.open(&path).unwrap();

    assert_eq!((block.rows(), block.cols()), (rows, cols));
    assert_eq!(block.read_submatrix(0..rows, 0..cols).unwrap(), matrix);
}

#[test]
fn file_with_two_matrices_is_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("twice.trmb");
    let mut writer = BlockFileWriter::new(BufWriter::new(File::create(&path).unwrap()));
    writer
        .push_matrix("first", &labelled(2, 2))
        .unwrap()
        .push_matrix("second", &labelled(2, 2))
        .unwrap();
    writer.finish().unwrap().flush().unwrap();

    let err = FileBlockStore.open(&path).unwrap_err();
    assert!(matches!(err.root(), TrimatError::Ambiguous(..)));
}

#[test]
fn file_with_only_attachments_is_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.trmb");
    let mut writer = BlockFileWriter::new(File::create(&path).unwrap());
    writer.push_attachment("readme", b"no matrix here").unwrap();
    writer.finish().unwrap();

    let file = BlockFile::open(&path).unwrap();
    assert_eq!(file.attachment("readme").unwrap().as_ref(), b"no matrix here");
    assert!(matches!(file.block().unwrap_err(), TrimatError::Ambiguous(..)));
}

#[test]
fn foreign_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data_1_1.trmb");
    std::fs::write(&path, b"this is not a block file at all").unwrap();

    let err = FileBlockStore.open(&path).unwrap_err();
    assert!(matches!(err.root(), TrimatError::InvalidSerde(..)));
}
