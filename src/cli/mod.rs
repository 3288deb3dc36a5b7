pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ConvertArgs, OutputFormatArg, SourcesArgs};
pub use output::{OutputFormat, OutputFormatter, SourceStatus};
