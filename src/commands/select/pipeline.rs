use anyhow::Result;
use log::{error, info};

use scselect_lib::core::error::SelectError;
use scselect_lib::core::fs::{make_parent_dirs, sibling_with_extension};
use scselect_lib::core::runlog::RunLog;
use scselect_lib::dataset::h5ad::load_h5ad;
use scselect_lib::report::render_summary;
use scselect_lib::rewrite::write_selected_matrix;
use scselect_lib::selection::{load_barcodes, resolve_selection};

use super::args::SelectArgs;

pub fn run_select(args: SelectArgs) -> Result<()> {
    info!("Running select");
    args.validate()?;
    make_parent_dirs(&args.output)?;

    let log_path = sibling_with_extension(&args.output, "log");
    let mut runlog = RunLog::create(&log_path, &invocation(), env!("CARGO_PKG_VERSION"))?;

    match execute_pipeline(&args, &mut runlog) {
        Ok(()) => {
            runlog.finish("Completed select")?;
            info!("Output written to: {}", args.output.display());
            Ok(())
        }
        Err(err) => {
            error!("select failed: {}", err);
            // best effort: the run log should still record the failure
            let _ = runlog.finish(&format!("Failed select: {err}"));
            Err(err.into())
        }
    }
}

fn execute_pipeline(args: &SelectArgs, runlog: &mut RunLog) -> Result<(), SelectError> {
    runlog.info(&format!("Reading input file: {}", args.input.display()))?;
    let dataset = load_h5ad(&args.input, runlog)?;
    runlog.info(&format!(
        "Loaded {} barcodes × {} genes",
        dataset.n_barcodes(),
        dataset.n_genes()
    ))?;

    let requested = match &args.barcodes {
        Some(path) => Some(load_barcodes(path)?),
        None => None,
    };
    let selection = resolve_selection(&dataset.barcodes, requested.as_deref(), runlog)?;

    write_selected_matrix(&dataset, &selection, &args.output)?;
    runlog.info(&format!(
        "Wrote selected matrix to {}",
        args.output.display()
    ))?;

    // The figure is a secondary output: a rendering failure downgrades to a
    // warning and the run still succeeds.
    let figure_path = sibling_with_extension(&args.output, "svg");
    if let Err(err) = render_summary(&dataset, &selection, &figure_path) {
        runlog.warn(&format!("Unable to save the summary plot: {err}"))?;
    }

    Ok(())
}

fn invocation() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}
