// CLI module - Command line interface
pub mod args;
pub mod commands;
pub mod output;

pub use args::{Args, Command, Mode, OutputFormat};
pub use commands::{execute_command, run_server};
pub use output::{ConsoleWriter, OutputWriter};
