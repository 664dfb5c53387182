pub mod error;
pub mod fs;
pub mod runlog;

pub mod prelude {
    pub use super::error::{Result, SelectError};
    pub use super::fs::{has_extension, make_parent_dirs, sibling_with_extension};
    pub use super::runlog::RunLog;
}
