mod select;

pub use select::{run_select, SelectArgs};
