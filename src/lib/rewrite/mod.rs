//! Slices the dataset to a selection and persists it as a CellRanger v3
//! matrix container.
//!
//! The output layout is fixed regardless of the input's provenance or
//! version: a `/matrix` group holding the column-compressed counts plus a
//! `features` table, the layout the CellRanger tool family reads.

use crate::core::error::{Result, SelectError};
use crate::dataset::CountsDataset;
use crate::selection::Selection;
use hdf5::types::VarLenAscii;
use hdf5::{File, Group};
use log::info;
use nalgebra_sparse::CsrMatrix;
use std::path::Path;

/// Container version written on output. Inputs of any vintage are
/// normalized to this version.
const CELLRANGER_VERSION: i64 = 3;
const FILETYPE: &str = "matrix";

/// Extract the rows of `matrix` named by `indices`, in that order.
///
/// This is the filter-and-reindex step the alignment invariant rides on:
/// output row `i` is exactly input row `indices[i]`, values untouched.
pub fn select_rows(matrix: &CsrMatrix<u32>, indices: &[usize]) -> Result<CsrMatrix<u32>> {
    let mut row_offsets = Vec::with_capacity(indices.len() + 1);
    let mut col_indices = Vec::new();
    let mut values = Vec::new();
    row_offsets.push(0);

    for &row_idx in indices {
        if row_idx >= matrix.nrows() {
            return Err(SelectError::DimensionMismatch {
                expected: format!("row index < {}", matrix.nrows()),
                actual: row_idx.to_string(),
            });
        }
        let row = matrix.row(row_idx);
        col_indices.extend_from_slice(row.col_indices());
        values.extend_from_slice(row.values());
        row_offsets.push(col_indices.len());
    }

    CsrMatrix::try_from_csr_data(
        indices.len(),
        matrix.ncols(),
        row_offsets,
        col_indices,
        values,
    )
    .map_err(|e| SelectError::SparseMatrix(format!("failed to assemble selected rows: {e:?}")))
}

/// Slice the dataset down to `selection` and write it at `path`.
///
/// The barcode axis is reindexed alongside the matrix rows; gene-axis
/// metadata passes through untouched. A writer failure is surfaced to the
/// caller, never swallowed.
pub fn write_selected_matrix(
    dataset: &CountsDataset,
    selection: &Selection,
    path: &Path,
) -> Result<()> {
    dataset.validate_alignment()?;

    let matrix = select_rows(&dataset.matrix, selection.indices())?;
    let barcodes: Vec<String> = selection
        .indices()
        .iter()
        .map(|&i| dataset.barcodes[i].clone())
        .collect();

    info!(
        "Writing {} barcodes × {} genes to {}",
        matrix.nrows(),
        matrix.ncols(),
        path.display()
    );

    let file = File::create(path).map_err(|e| {
        SelectError::Storage(format!("unable to create {}: {e}", path.display()))
    })?;
    write_str_attr(&file, "filetype", FILETYPE)?;
    file.new_attr::<i64>()
        .create("version")?
        .write_scalar(&CELLRANGER_VERSION)?;

    let group = file.create_group("matrix")?;
    write_counts(&group, &matrix)?;
    group
        .new_dataset_builder()
        .with_data(&ascii_column(&barcodes)?)
        .create("barcodes")?;
    write_features(&group, dataset)?;
    Ok(())
}

/// Write the counts in the container's column-compressed form.
///
/// The container stores the gene-major transpose in CSC. Its buffers are
/// exactly the CSR buffers of the barcode-major matrix: one `indptr` slot
/// per barcode, gene indices, counts. No transposition is computed.
fn write_counts(group: &Group, matrix: &CsrMatrix<u32>) -> Result<()> {
    let (row_offsets, col_indices, values) = matrix.csr_data();

    let data: Vec<i32> = values.iter().map(|&v| v as i32).collect();
    let indices: Vec<i64> = col_indices.iter().map(|&c| c as i64).collect();
    let indptr: Vec<i64> = row_offsets.iter().map(|&o| o as i64).collect();
    let shape: Vec<i32> = vec![matrix.ncols() as i32, matrix.nrows() as i32];

    group.new_dataset_builder().with_data(&data).create("data")?;
    group
        .new_dataset_builder()
        .with_data(&indices)
        .create("indices")?;
    group
        .new_dataset_builder()
        .with_data(&indptr)
        .create("indptr")?;
    group
        .new_dataset_builder()
        .with_data(&shape)
        .create("shape")?;
    Ok(())
}

fn write_features(group: &Group, dataset: &CountsDataset) -> Result<()> {
    let features = group.create_group("features")?;
    features
        .new_dataset_builder()
        .with_data(&ascii_column(&dataset.gene_ids)?)
        .create("id")?;
    features
        .new_dataset_builder()
        .with_data(&ascii_column(&dataset.gene_names)?)
        .create("name")?;
    features
        .new_dataset_builder()
        .with_data(&ascii_column(&dataset.feature_types)?)
        .create("feature_type")?;
    features
        .new_dataset_builder()
        .with_data(&ascii_column(&dataset.genomes)?)
        .create("genome")?;

    let tag_keys = ["genome".to_string()];
    features
        .new_dataset_builder()
        .with_data(&ascii_column(&tag_keys)?)
        .create("_all_tag_keys")?;
    Ok(())
}

fn ascii_column(values: &[String]) -> Result<Vec<VarLenAscii>> {
    values
        .iter()
        .map(|v| {
            VarLenAscii::from_ascii(v).map_err(|e| {
                SelectError::Storage(format!("non-ASCII value {v:?} in output table: {e:?}"))
            })
        })
        .collect()
}

fn write_str_attr(file: &File, name: &str, value: &str) -> Result<()> {
    let ascii = VarLenAscii::from_ascii(value)
        .map_err(|e| SelectError::Storage(format!("invalid attribute {name:?}: {e:?}")))?;
    file.new_attr::<VarLenAscii>()
        .create(name)?
        .write_scalar(&ascii)?;
    Ok(())
}
