//! CLI entry points.

mod commands;

pub use commands::{is_verbose, run};
