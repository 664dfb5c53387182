//! Loader adapter for AnnData (`.h5ad`) containers.
//!
//! Normalizes the on-disk AnnData layout into a [`CountsDataset`]. The rest
//! of the pipeline depends only on that record, never on AnnData specifics,
//! so the reader can be swapped without touching selection, rewrite, or
//! report logic.

use crate::core::error::{Result, SelectError};
use crate::core::runlog::RunLog;
use crate::dataset::CountsDataset;
use anndata::data::{ArrayData, Element};
use anndata::{traits::AnnDataOp, AnnData, Backend};
use anndata_hdf5::H5;
use log::{debug, info};
use nalgebra_sparse::CsrMatrix;
use polars::prelude::*;
use std::path::Path;

/// `obs` columns probed for per-barcode UMI counts, in priority order.
const UMI_COLUMNS: &[&str] = &["n_fragments", "num_fragments", "n_umis", "total_counts"];
/// `obs` columns probed for percent-intronic-reads.
const PCT_INTRONIC_COLUMNS: &[&str] = &["pct_intronic", "pct_reads_intronic", "frac_intronic"];

const GENE_NAME_COLUMNS: &[&str] = &["gene_names", "gene_name", "name"];
const FEATURE_TYPE_COLUMNS: &[&str] = &["feature_type", "feature_types"];
const GENOME_COLUMNS: &[&str] = &["genome", "genomes"];

/// Load an `.h5ad` count matrix into the normalized dataset record.
///
/// Missing QC columns are not an error: the load proceeds and a warning is
/// recorded on the run log so downstream consumers can degrade gracefully.
pub fn load_h5ad(path: &Path, runlog: &mut RunLog) -> Result<CountsDataset> {
    if !path.exists() {
        return Err(SelectError::Storage(format!(
            "unable to open file {}",
            path.display()
        )));
    }

    let adata = AnnData::<H5>::open(H5::open(path).map_err(|e| {
        SelectError::Storage(format!("unable to open file {}: {e:?}", path.display()))
    })?)?;

    let n_obs = adata.n_obs();
    let n_vars = adata.n_vars();
    info!("AnnData shape: {n_obs} barcodes × {n_vars} genes");
    if n_obs == 0 || n_vars == 0 {
        return Err(SelectError::EmptyData(format!(
            "{n_obs} barcodes × {n_vars} genes"
        )));
    }

    let barcodes: Vec<String> = adata.obs_names().into_vec();
    let gene_ids: Vec<String> = adata.var_names().into_vec();

    let matrix = read_count_matrix(&adata)?;
    if matrix.nrows() != n_obs || matrix.ncols() != n_vars {
        return Err(SelectError::DimensionMismatch {
            expected: format!("count matrix {n_obs}×{n_vars}"),
            actual: format!("count matrix {}×{}", matrix.nrows(), matrix.ncols()),
        });
    }

    let obs = adata.read_obs().unwrap_or_else(|e| {
        debug!("no obs table in input: {e:?}");
        DataFrame::empty()
    });
    let var = adata.read_var().unwrap_or_else(|e| {
        debug!("no var table in input: {e:?}");
        DataFrame::empty()
    });

    let umi_counts = float_column(&obs, UMI_COLUMNS);
    let pct_intronic = float_column(&obs, PCT_INTRONIC_COLUMNS);
    if umi_counts.is_none() {
        runlog.warn("No UMI counts detected in the input data.")?;
    }
    if pct_intronic.is_none() {
        runlog.warn("No intronic read counts or percentage detected in the input data.")?;
    }

    let gene_names =
        string_column(&var, GENE_NAME_COLUMNS).unwrap_or_else(|| gene_ids.clone());
    let feature_types = string_column(&var, FEATURE_TYPE_COLUMNS)
        .unwrap_or_else(|| vec!["Gene Expression".to_string(); n_vars]);
    let genomes =
        string_column(&var, GENOME_COLUMNS).unwrap_or_else(|| vec!["NA".to_string(); n_vars]);

    let dataset = CountsDataset {
        matrix,
        barcodes,
        gene_names,
        gene_ids,
        feature_types,
        genomes,
        umi_counts,
        pct_intronic,
    };
    dataset.validate_alignment()?;
    Ok(dataset)
}

fn read_count_matrix(adata: &AnnData<H5>) -> Result<CsrMatrix<u32>> {
    let mut x_elem = adata
        .x()
        .extract()
        .ok_or_else(|| SelectError::EmptyData("input has no count matrix (X)".to_string()))?;

    let array = x_elem
        .data()
        .map_err(|e| SelectError::Storage(format!("failed to read count matrix: {e:?}")))?;
    convert_array_to_csr_u32(array)
}

/// Accept the count dtypes AnnData files carry in the wild and normalize
/// them to `u32` counts. Every stored value must be a non-negative integer
/// that fits in `u32`; negative or fractional entries are rejected rather
/// than silently truncated.
fn convert_array_to_csr_u32(array: ArrayData) -> Result<CsrMatrix<u32>> {
    if let Ok(matrix) = CsrMatrix::<u32>::try_from(array.clone()) {
        return Ok(matrix);
    }
    if let Ok(matrix) = CsrMatrix::<i32>::try_from(array.clone()) {
        return recast(&matrix, |v| u32::try_from(v).ok());
    }
    if let Ok(matrix) = CsrMatrix::<i64>::try_from(array.clone()) {
        return recast(&matrix, |v| u32::try_from(v).ok());
    }
    if let Ok(matrix) = CsrMatrix::<f32>::try_from(array.clone()) {
        return recast(&matrix, |v| count_from_float(v as f64));
    }
    if let Ok(matrix) = CsrMatrix::<f64>::try_from(array.clone()) {
        return recast(&matrix, count_from_float);
    }

    Err(SelectError::Storage(format!(
        "unsupported array data type for count matrix: {:?}",
        array.data_type()
    )))
}

fn count_from_float(v: f64) -> Option<u32> {
    if v.is_finite() && v.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&v) {
        Some(v as u32)
    } else {
        None
    }
}

fn recast<T: Copy>(
    matrix: &CsrMatrix<T>,
    cast: impl Fn(T) -> Option<u32>,
) -> Result<CsrMatrix<u32>> {
    let (row_offsets, col_indices, values) = matrix.csr_data();
    let values: Vec<u32> = values
        .iter()
        .map(|&v| {
            cast(v).ok_or_else(|| {
                SelectError::Storage(
                    "count matrix contains values that are not non-negative integers".to_string(),
                )
            })
        })
        .collect::<Result<_>>()?;

    CsrMatrix::try_from_csr_data(
        matrix.nrows(),
        matrix.ncols(),
        row_offsets.to_vec(),
        col_indices.to_vec(),
        values,
    )
    .map_err(|e| SelectError::SparseMatrix(format!("failed to recast count matrix: {e:?}")))
}

/// Extract the first matching column as `f64` values; `None` when no
/// candidate is present or the column cannot be read numerically.
fn float_column(df: &DataFrame, candidates: &[&str]) -> Option<Vec<f64>> {
    for name in candidates {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let series = column.as_materialized_series();
        if let Ok(cast) = series.cast(&DataType::Float64) {
            if let Ok(values) = cast.f64() {
                return Some(
                    values
                        .into_iter()
                        .map(|v| v.unwrap_or(f64::NAN))
                        .collect(),
                );
            }
        }
    }
    None
}

fn string_column(df: &DataFrame, candidates: &[&str]) -> Option<Vec<String>> {
    for name in candidates {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let series = column.as_materialized_series();
        if let Ok(cast) = series.cast(&DataType::String) {
            if let Ok(values) = cast.str() {
                return Some(
                    values
                        .into_iter()
                        .map(|v| v.unwrap_or("").to_string())
                        .collect(),
                );
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    fn csr_from<T>(entries: &[(usize, usize, T)]) -> CsrMatrix<T>
    where
        T: Copy + std::fmt::Debug + PartialEq + std::ops::AddAssign + num_traits::Zero + 'static,
    {
        let mut coo = CooMatrix::new(2, 3);
        for &(i, j, v) in entries {
            coo.push(i, j, v);
        }
        CsrMatrix::from(&coo)
    }

    #[test]
    fn integral_floats_recast_to_counts() {
        let matrix = csr_from(&[(0, 0, 2.0f64), (1, 2, 7.0)]);
        let counts = recast(&matrix, count_from_float).unwrap();
        assert_eq!(counts.row(0).values(), &[2]);
        assert_eq!(counts.row(1).values(), &[7]);
    }

    #[test]
    fn fractional_floats_are_rejected() {
        let matrix = csr_from(&[(0, 0, 2.5f64)]);
        assert!(matches!(
            recast(&matrix, count_from_float),
            Err(SelectError::Storage(_))
        ));
    }

    #[test]
    fn negative_integers_are_rejected() {
        let matrix = csr_from(&[(0, 0, -1i32), (1, 1, 5)]);
        assert!(matches!(
            recast(&matrix, |v| u32::try_from(v).ok()),
            Err(SelectError::Storage(_))
        ));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert_eq!(count_from_float(f64::NAN), None);
        assert_eq!(count_from_float(f64::INFINITY), None);
        assert_eq!(count_from_float(-3.0), None);
        assert_eq!(count_from_float(3.0), Some(3));
    }

    fn obs_table() -> DataFrame {
        DataFrame::new(vec![
            Series::new("n_fragments".into(), vec![120.0f64, 3400.0, 56.0]).into(),
            Series::new("pct_intronic".into(), vec![10.5f64, 42.0, 3.25]).into(),
            Series::new("cell_type".into(), vec!["a", "b", "c"]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn qc_columns_are_found_by_priority() {
        let obs = obs_table();
        assert_eq!(
            float_column(&obs, UMI_COLUMNS),
            Some(vec![120.0, 3400.0, 56.0])
        );
        assert_eq!(
            float_column(&obs, PCT_INTRONIC_COLUMNS),
            Some(vec![10.5, 42.0, 3.25])
        );
    }

    #[test]
    fn missing_qc_columns_yield_none() {
        let obs = DataFrame::new(vec![
            Series::new("cell_type".into(), vec!["a", "b"]).into()
        ])
        .unwrap();
        assert_eq!(float_column(&obs, UMI_COLUMNS), None);
        assert_eq!(float_column(&obs, PCT_INTRONIC_COLUMNS), None);
        assert_eq!(float_column(&DataFrame::empty(), UMI_COLUMNS), None);
    }

    #[test]
    fn integer_columns_are_read_as_floats() {
        let obs = DataFrame::new(vec![
            Series::new("n_fragments".into(), vec![1i64, 2, 3]).into()
        ])
        .unwrap();
        assert_eq!(float_column(&obs, UMI_COLUMNS), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn gene_metadata_columns_fall_back_in_order() {
        let var = DataFrame::new(vec![
            Series::new("gene_names".into(), vec!["ACTB", "GAPDH"]).into(),
            Series::new("genome".into(), vec!["GRCh38", "GRCh38"]).into(),
        ])
        .unwrap();
        assert_eq!(
            string_column(&var, GENE_NAME_COLUMNS),
            Some(vec!["ACTB".to_string(), "GAPDH".to_string()])
        );
        assert_eq!(string_column(&var, FEATURE_TYPE_COLUMNS), None);
        assert_eq!(
            string_column(&var, GENOME_COLUMNS),
            Some(vec!["GRCh38".to_string(), "GRCh38".to_string()])
        );
    }
}
