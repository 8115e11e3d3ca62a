//! CLI command handlers

pub mod args;
pub mod commands;

pub use args::{FilterArgs, SourceArgs};
pub use commands::{bars, export, options, scatter, sheets, view, watch, ChartRequest};
