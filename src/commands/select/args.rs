use scselect_lib::core::error::SelectError;
use scselect_lib::core::fs::has_extension;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "select",
    about = "Subset a single-cell count matrix to a list of barcodes"
)]
pub struct SelectArgs {
    #[structopt(
        long,
        parse(from_os_str),
        help = "Input count matrix in AnnData (.h5ad) format. The data should \
                be un-filtered (include empty droplets); only .h5ad input is \
                supported."
    )]
    pub input: PathBuf,

    #[structopt(
        long,
        parse(from_os_str),
        help = "File containing the barcodes to sub-select, one per line, no \
                header. When omitted, all barcodes are passed through."
    )]
    pub barcodes: Option<PathBuf>,

    #[structopt(
        long,
        parse(from_os_str),
        help = "Output file location. The file name must have a .h5 extension; \
                the QC figure and run log are placed next to it."
    )]
    pub output: PathBuf,

    #[structopt(long, help = "Log extra messages useful for debugging")]
    pub debug: bool,
}

impl SelectArgs {
    /// Fail fast on unsupported extensions, before any loading is attempted.
    pub fn validate(&self) -> Result<(), SelectError> {
        if !has_extension(&self.input, "h5ad") {
            return Err(SelectError::UnsupportedFormat(format!(
                "input file must be a .h5ad file, got {}",
                self.input.display()
            )));
        }
        if !has_extension(&self.output, "h5") {
            return Err(SelectError::UnsupportedFormat(format!(
                "output file must have a .h5 extension, got {}",
                self.output.display()
            )));
        }
        Ok(())
    }
}
