pub mod args;
pub mod pipeline;

pub use args::SelectArgs;
pub use pipeline::run_select;
