//! Barcode list loading and resolution into matrix row indices.

use crate::core::error::{Result, SelectError};
use crate::core::runlog::RunLog;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Ordered, immutable set of matrix row indices retained for output.
///
/// Built once per run by [`resolve_selection`] and consumed by both the
/// matrix rewriter and the QC reporter. Holds index positions only, never
/// a copy of the matrix.
#[derive(Debug, Clone)]
pub struct Selection {
    indices: Vec<usize>,
    requested: usize,
    missing: usize,
}

impl Selection {
    /// Build a selection from explicit row indices.
    pub fn from_indices(indices: Vec<usize>) -> Self {
        let requested = indices.len();
        Selection {
            indices,
            requested,
            missing: 0,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of entries in the original request, duplicates included.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of requested barcodes that were not present in the dataset.
    pub fn missing(&self) -> usize {
        self.missing
    }
}

/// Read a barcode list: one identifier per line, no header.
///
/// Blank lines are skipped. No deduplication or format validation happens
/// here; both are the selection engine's concern.
pub fn load_barcodes(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| {
        SelectError::Storage(format!(
            "unable to read barcode list {}: {e}",
            path.display()
        ))
    })?;
    let reader = BufReader::with_capacity(256 * 1024, file);

    let mut barcodes = Vec::with_capacity(1024);
    for line in reader.lines() {
        let line = line?;
        let barcode = line.trim();
        if !barcode.is_empty() {
            barcodes.push(barcode.to_string());
        }
    }
    barcodes.shrink_to_fit();
    Ok(barcodes)
}

/// Resolve the requested barcodes into dataset row indices.
///
/// With no request, the selection is the identity over the dataset order
/// and a warning notes that no filtering occurred. With a request, output
/// order follows the list order (not the dataset order), duplicates
/// collapse to their first occurrence, and entries unknown to the dataset
/// are skipped with a single counted warning. An empty request list and a
/// request in which nothing resolves are both errors rather than an empty
/// output, each reported for what it is.
pub fn resolve_selection(
    barcodes: &[String],
    requested: Option<&[String]>,
    runlog: &mut RunLog,
) -> Result<Selection> {
    let Some(requested) = requested else {
        runlog.warn("No barcodes selected. Using all barcodes.")?;
        return Ok(Selection {
            indices: (0..barcodes.len()).collect(),
            requested: barcodes.len(),
            missing: 0,
        });
    };

    if requested.is_empty() {
        return Err(SelectError::Lookup(
            "the barcode list contains no barcodes".to_string(),
        ));
    }

    let position: FxHashMap<&str, usize> = barcodes
        .iter()
        .enumerate()
        .map(|(i, barcode)| (barcode.as_str(), i))
        .collect();

    let mut indices = Vec::with_capacity(requested.len());
    let mut seen = FxHashSet::default();
    let mut missing = 0usize;

    for barcode in requested {
        match position.get(barcode.as_str()) {
            Some(&idx) => {
                if seen.insert(idx) {
                    indices.push(idx);
                } else {
                    debug!("duplicate barcode in selection list: {barcode}");
                }
            }
            None => missing += 1,
        }
    }

    if missing > 0 {
        runlog.warn(&format!(
            "{missing} of {} requested barcodes are not present in the dataset and were skipped",
            requested.len()
        ))?;
    }

    if indices.is_empty() {
        return Err(SelectError::Lookup(
            "none of the requested barcodes are present in the dataset".to_string(),
        ));
    }

    runlog.info(&format!(
        "Selected {} of {} barcodes",
        indices.len(),
        barcodes.len()
    ))?;

    Ok(Selection {
        indices,
        requested: requested.len(),
        missing,
    })
}
