//! Normalized in-memory record for a single-cell count matrix.

use crate::core::error::{Result, SelectError};
use nalgebra_sparse::CsrMatrix;

pub mod h5ad;

/// A loaded count matrix together with its barcode- and gene-axis metadata.
///
/// Rows are barcodes, columns are genes. Every field documented as
/// index-aligned with `barcodes` must keep that alignment for the lifetime
/// of the record: position `i` of each array describes `barcodes[i]`.
/// [`CountsDataset::validate_alignment`] enforces this at the trust
/// boundaries (after loading, before rewriting).
///
/// The barcode-major CSR layout doubles as the column-compressed (CSC)
/// layout of the gene-major transpose, which is what the CellRanger
/// container stores on disk.
#[derive(Debug, Clone)]
pub struct CountsDataset {
    /// Sparse counts: `matrix[(i, j)]` is the count of gene `j` in barcode `i`.
    pub matrix: CsrMatrix<u32>,
    /// Barcode identifiers, index-aligned with matrix rows.
    pub barcodes: Vec<String>,
    /// Gene display names, index-aligned with matrix columns.
    pub gene_names: Vec<String>,
    /// Gene identifiers, index-aligned with matrix columns.
    pub gene_ids: Vec<String>,
    /// Feature type per gene, for example "Gene Expression".
    pub feature_types: Vec<String>,
    /// Genome of origin per gene.
    pub genomes: Vec<String>,
    /// Per-barcode UMI counts, when the source provides them.
    pub umi_counts: Option<Vec<f64>>,
    /// Per-barcode percent-intronic-reads, when the source provides it.
    pub pct_intronic: Option<Vec<f64>>,
}

impl CountsDataset {
    pub fn n_barcodes(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_genes(&self) -> usize {
        self.matrix.ncols()
    }

    /// Check that every parallel array matches its matrix axis.
    pub fn validate_alignment(&self) -> Result<()> {
        check_axis("barcodes", self.barcodes.len(), self.n_barcodes())?;
        if let Some(umi_counts) = &self.umi_counts {
            check_axis("umi_counts", umi_counts.len(), self.n_barcodes())?;
        }
        if let Some(pct_intronic) = &self.pct_intronic {
            check_axis("pct_intronic", pct_intronic.len(), self.n_barcodes())?;
        }

        let gene_axis = [
            ("gene_names", self.gene_names.len()),
            ("gene_ids", self.gene_ids.len()),
            ("feature_types", self.feature_types.len()),
            ("genomes", self.genomes.len()),
        ];
        for (name, len) in gene_axis {
            check_axis(name, len, self.n_genes())?;
        }
        Ok(())
    }
}

fn check_axis(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(SelectError::DimensionMismatch {
            expected: format!("{name} length = {expected}"),
            actual: format!("{name} length = {actual}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    fn dataset(n_barcodes: usize, n_genes: usize) -> CountsDataset {
        let coo = CooMatrix::new(n_barcodes, n_genes);
        CountsDataset {
            matrix: CsrMatrix::from(&coo),
            barcodes: (0..n_barcodes).map(|i| format!("BC{i}")).collect(),
            gene_names: (0..n_genes).map(|i| format!("Gene{i}")).collect(),
            gene_ids: (0..n_genes).map(|i| format!("ENSG{i:08}")).collect(),
            feature_types: vec!["Gene Expression".to_string(); n_genes],
            genomes: vec!["GRCh38".to_string(); n_genes],
            umi_counts: None,
            pct_intronic: None,
        }
    }

    #[test]
    fn aligned_dataset_passes() {
        let mut ds = dataset(4, 3);
        ds.umi_counts = Some(vec![1.0; 4]);
        ds.pct_intronic = Some(vec![0.5; 4]);
        assert!(ds.validate_alignment().is_ok());
    }

    #[test]
    fn misaligned_barcode_axis_is_rejected() {
        let mut ds = dataset(4, 3);
        ds.barcodes.pop();
        assert!(matches!(
            ds.validate_alignment(),
            Err(SelectError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn misaligned_qc_field_is_rejected() {
        let mut ds = dataset(4, 3);
        ds.umi_counts = Some(vec![1.0; 3]);
        assert!(ds.validate_alignment().is_err());
    }

    #[test]
    fn misaligned_gene_axis_is_rejected() {
        let mut ds = dataset(4, 3);
        ds.genomes.push("GRCh38".to_string());
        assert!(ds.validate_alignment().is_err());
    }
}
