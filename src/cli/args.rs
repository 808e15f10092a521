use crate::domain::config::BridgeConfig;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for SerBridge
#[derive(Parser, Debug)]
#[command(
    name = "serbridge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Forward a serial port device to a TCP socket",
    long_about = "Forward a serial port device to a TCP socket for use with TCP based terminal tools. \
                  Every TCP client gets its own session with the serial device; bytes are relayed verbatim in both directions."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// List all serial port devices on the system
    #[arg(long)]
    pub list: bool,

    #[command(flatten)]
    pub bridge: BridgeArgs,

    /// Command to execute (defaults to serve)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Serial device and listener overrides
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct BridgeArgs {
    /// Path to serial port, such as /dev/cu.usbserial-32310
    #[arg(short, long, global = true)]
    pub device: Option<String>,

    /// Serial port speed (default 9600)
    #[arg(short, long, visible_alias = "baud", global = true)]
    pub speed: Option<u32>,

    /// TCP port number for the serial port mirror (default 8888)
    #[arg(short, long, visible_alias = "tcpport", global = true)]
    pub port: Option<String>,

    /// Address to listen on (default 0.0.0.0)
    #[arg(short, long, global = true)]
    pub bind: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Forward the serial device to TCP clients
    Serve,
    /// List all serial port devices on the system
    List,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Create a default project configuration
    Init {
        /// Directory to create .serbridge/config.toml in
        #[arg(long)]
        dir: Option<String>,
    },
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
    /// CSV output
    Csv,
}

impl Args {
    /// Mode selected by this invocation
    pub fn mode(&self) -> Mode {
        if self.list {
            return Mode::List;
        }
        match &self.command {
            None | Some(Command::Serve) => Mode::Serve,
            Some(Command::List) => Mode::List,
            Some(Command::Config(_)) => Mode::Config,
            Some(Command::Version) => Mode::Version,
        }
    }
}

/// Exactly one mode runs per invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    List,
    Config,
    Version,
}

impl BridgeArgs {
    /// Apply command line overrides on top of file configuration
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(device) = &self.device {
            config.serial.device = device.clone();
        }
        if let Some(speed) = self.speed {
            config.serial.baud_rate = speed;
        }
        if let Some(port) = &self.port {
            config.server.port = port.clone();
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
