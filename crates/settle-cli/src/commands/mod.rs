pub mod apps;
pub mod common;
pub mod completions;
pub mod expanded;
pub mod set;
pub mod status;
