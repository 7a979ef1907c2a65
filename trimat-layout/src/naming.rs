/// The file name of block `(row, col)` (1-based) in a layout of `q` block rows:
/// `<prefix>_<row>_<col>.<extension>`, with both indices zero-padded to the digit count of `q`
/// so that names sort in canonical triangular order.
pub fn block_file_name(prefix: &str, row: usize, col: usize, q: usize, extension: &str) -> String {
    let width = q.to_string().len();
    format!("{prefix}_{row:0width$}_{col:0width$}.{extension}")
}
