//! scselect - subset single-cell RNA count matrices to selected barcodes
//!
//! scselect takes an unfiltered single-cell count matrix in AnnData format,
//! restricts it to a caller-supplied list of cell barcodes, and rewrites the
//! result as a CellRanger v3 matrix container alongside a QC summary figure
//! and a run log.
//!
//! # Usage
//!
//! ```bash
//! # Keep only the barcodes listed in cells.txt
//! scselect select --input raw.h5ad --barcodes cells.txt --output selected.h5
//!
//! # No list: pass every barcode through (the container is still normalized
//! # to the CellRanger v3 layout)
//! scselect select --input raw.h5ad --output all.h5
//! ```

extern crate scselect_lib;
pub mod commands;
use anyhow::Result;
use env_logger::Env;
use log::*;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case", author, about)]
/// Commands for subsetting single-cell count matrices
struct Args {
    #[structopt(subcommand)]
    subcommand: Subcommand,
}

#[derive(StructOpt)]
enum Subcommand {
    /// Restrict a count matrix to selected barcodes and rewrite it as a
    /// CellRanger v3 container
    Select(commands::SelectArgs),
}

impl Subcommand {
    fn debug(&self) -> bool {
        match self {
            Subcommand::Select(args) => args.debug,
        }
    }

    fn run(self) -> Result<()> {
        match self {
            Subcommand::Select(args) => commands::run_select(args)?,
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::from_args();
    let default_level = if args.subcommand.debug() {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if let Err(err) = args.subcommand.run() {
        error!("{}", err);
        std::process::exit(1);
    }
    Ok(())
}
