//! Per-run log file kept next to the primary output.

use crate::core::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const LINE_PREFIX: &str = "scselect:select";

/// Run-scoped log sink.
///
/// Every message is mirrored to the console logger and appended to the
/// run's log file, so each invocation leaves a self-contained record of
/// the command, version, warnings, and completion status. The sink is
/// passed explicitly to each pipeline component instead of living in
/// process-global state.
pub struct RunLog {
    writer: BufWriter<File>,
    warnings: usize,
}

impl RunLog {
    /// Create the log file, recording the invocation and tool version.
    pub fn create(path: &Path, command: &str, version: &str) -> Result<Self> {
        let writer = BufWriter::new(File::create(path)?);
        let mut runlog = RunLog {
            writer,
            warnings: 0,
        };
        runlog.info(&format!("Command: {command}"))?;
        runlog.info(&format!("scselect {version}"))?;
        Ok(runlog)
    }

    pub fn info(&mut self, message: &str) -> Result<()> {
        log::info!("{message}");
        writeln!(self.writer, "{LINE_PREFIX}: {message}")?;
        Ok(())
    }

    pub fn warn(&mut self, message: &str) -> Result<()> {
        self.warnings += 1;
        log::warn!("{message}");
        writeln!(self.writer, "{LINE_PREFIX}: WARNING: {message}")?;
        Ok(())
    }

    /// Number of warnings recorded so far.
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Record the final status and flush the file.
    pub fn finish(mut self, status: &str) -> Result<()> {
        let warnings = self.warnings;
        self.info(&format!("{status} ({warnings} warning(s))"))?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_command_warnings_and_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let mut runlog = RunLog::create(&path, "scselect select --input in.h5ad", "0.1.0").unwrap();
        runlog.warn("No UMI counts detected in the input data").unwrap();
        assert_eq!(runlog.warnings(), 1);
        runlog.finish("Completed select").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Command: scselect select --input in.h5ad"));
        assert!(contents.contains("scselect 0.1.0"));
        assert!(contents.contains("WARNING: No UMI counts detected"));
        assert!(contents.contains("Completed select (1 warning(s))"));
    }
}
