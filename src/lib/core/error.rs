//! Error types for the scselect library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AnnData error: {0}")]
    AnnData(#[from] anyhow::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("barcode lookup error: {0}")]
    Lookup(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("sparse matrix error: {0}")]
    SparseMatrix(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("empty data: {0}")]
    EmptyData(String),
}

pub type Result<T> = std::result::Result<T, SelectError>;
