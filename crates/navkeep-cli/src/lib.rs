//! Navkeep CLI Library
//!
//! Command-line access to navkeep's session records, frame-tree queries and
//! selector derivation, for debugging restore behaviour against saved page
//! fixtures.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, FormatArg, InspectArgs, LogFormatArg, QueryArgs, SelectorArgs,
};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_matches, render_record, OutputFormat, Reporter};
