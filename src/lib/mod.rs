//! scselect: restrict single-cell RNA count matrices to selected barcodes.
//!
//! The library implements a single-pass pipeline over an in-memory count
//! matrix: load, resolve a barcode selection, rewrite the selected rows as
//! a CellRanger v3 container, and render a QC summary figure.
//!
//! # Modules
//!
//! - [`dataset`]: the normalized dataset record and the `.h5ad` loader adapter
//! - [`selection`]: barcode list loading and resolution into row indices
//! - [`rewrite`]: row slicing and the CellRanger v3 matrix writer
//! - [`report`]: the two-panel QC summary figure
//! - [`core`]: errors, filesystem helpers, and the per-run log

pub mod core;
pub mod dataset;
pub mod report;
pub mod rewrite;
pub mod selection;
