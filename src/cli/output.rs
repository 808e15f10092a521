use crate::cli::args::OutputFormat;
use crate::domain::config::BridgeConfig;
use crate::infrastructure::serial::PortEntry;
use std::io::{self, Write};
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError>;
    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::SerBridgeError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Render a port listing in the given format
pub fn render_ports(format: &OutputFormat, ports: &[PortEntry]) -> Result<String, OutputError> {
    let rendered = match format {
        OutputFormat::Text => ports
            .iter()
            .map(|port| format!("Found serial device: {}\n", port.path))
            .collect(),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(ports)?),
        OutputFormat::Table => {
            let rows: Vec<PortTableRow> = ports.iter().map(PortTableRow::from).collect();
            format!("{}\n", Table::new(rows))
        }
        OutputFormat::Csv => {
            let mut csv = "path,kind\n".to_string();
            for port in ports {
                csv.push_str(&format!("{},{}\n", port.path, port.kind));
            }
            csv
        }
    };
    Ok(rendered)
}

/// Render the effective configuration in the given format
pub fn render_config(format: &OutputFormat, config: &BridgeConfig) -> Result<String, OutputError> {
    let rendered = match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(config)?),
        OutputFormat::Table => {
            let rows = config_rows(config);
            format!("{}\n", Table::new(rows))
        }
        OutputFormat::Csv => {
            let mut csv = "key,value\n".to_string();
            for row in config_rows(config) {
                csv.push_str(&format!("{},{}\n", row.key, row.value));
            }
            csv
        }
        OutputFormat::Text => toml::to_string_pretty(config)?,
    };
    Ok(rendered)
}

/// Render an error report; JSON output stays machine readable
pub fn render_error(format: &OutputFormat, error: &str) -> Result<String, OutputError> {
    let rendered = match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "error": error,
                "level": "error"
            });
            format!("{}\n", serde_json::to_string_pretty(&output)?)
        }
        _ => format!("Error: {}\n", error),
    };
    Ok(rendered)
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(render_ports(&self.format, ports)?.as_bytes())?;
        Ok(())
    }

    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(render_config(&self.format, config)?.as_bytes())?;
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(render_error(&self.format, error)?.as_bytes())?;
        Ok(())
    }
}

/// Table row for a serial port
#[derive(Tabled)]
struct PortTableRow {
    path: String,
    kind: String,
}

impl From<&PortEntry> for PortTableRow {
    fn from(port: &PortEntry) -> Self {
        Self {
            path: port.path.clone(),
            kind: port.kind.clone(),
        }
    }
}

/// Table row for a configuration key
#[derive(Tabled)]
struct ConfigTableRow {
    key: String,
    value: String,
}

fn config_rows(config: &BridgeConfig) -> Vec<ConfigTableRow> {
    let row = |key: &str, value: String| ConfigTableRow {
        key: key.to_string(),
        value,
    };
    vec![
        row("global.log_level", config.global.log_level.clone()),
        row("serial.device", config.serial.device.clone()),
        row("serial.baud_rate", config.serial.baud_rate.to_string()),
        row("server.bind", config.server.bind.clone()),
        row("server.port", config.server.port.clone()),
        row("ports.prefix", config.ports.prefix.clone()),
        row("relay.half_close", config.relay.half_close.to_string()),
        row("relay.buffer_size", config.relay.buffer_size.to_string()),
    ]
}
