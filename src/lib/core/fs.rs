use anyhow::Result;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Create parent directories for a path when missing.
pub fn make_parent_dirs<P: AsRef<Path>>(path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Case-insensitive check of a path's final extension.
pub fn has_extension<P: AsRef<Path>>(path: P, ext: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Derive a sibling path sharing the stem of `path` but carrying `ext`.
///
/// Used to place the run log and the summary figure next to the primary
/// output (`out.h5` -> `out.log`, `out.svg`).
pub fn sibling_with_extension<P: AsRef<Path>>(path: P, ext: &str) -> PathBuf {
    path.as_ref().with_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_extension("data/matrix.h5ad", "h5ad"));
        assert!(has_extension("data/matrix.H5AD", "h5ad"));
        assert!(!has_extension("data/matrix.csv", "h5ad"));
        assert!(!has_extension("matrix", "h5ad"));
    }

    #[test]
    fn sibling_paths_share_the_stem() {
        assert_eq!(
            sibling_with_extension("out/selected.h5", "log"),
            PathBuf::from("out/selected.log")
        );
        assert_eq!(
            sibling_with_extension("out/selected.h5", "svg"),
            PathBuf::from("out/selected.svg")
        );
    }
}
