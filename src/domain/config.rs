use crate::domain::error::{SerBridgeError, SerBridgeResult};
use serde::{Deserialize, Serialize};

/// SerBridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Serial device settings
    #[serde(default)]
    pub serial: SerialSettings,
    /// TCP listener settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Port enumeration settings
    #[serde(default)]
    pub ports: PortSettings,
    /// Relay behaviour
    #[serde(default)]
    pub relay: RelaySettings,
}

/// Global configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serial device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Path to the serial device
    #[serde(default = "default_device")]
    pub device: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// TCP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// TCP port
    #[serde(default = "default_tcp_port")]
    pub port: String,
}

/// Port enumeration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSettings {
    /// Only device paths starting with this prefix are listed
    #[serde(default = "default_port_prefix")]
    pub prefix: String,
}

/// Relay behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Keep forwarding device output after the client shuts down its write side
    #[serde(default = "default_half_close")]
    pub half_close: bool,
    /// Copy buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_device() -> String {
    "/dev/cu.usbserial-foo".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_tcp_port() -> String {
    "8888".to_string()
}

#[cfg(target_os = "macos")]
fn default_port_prefix() -> String {
    "/dev/cu.".to_string()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn default_port_prefix() -> String {
    "/dev/tty".to_string()
}

#[cfg(windows)]
fn default_port_prefix() -> String {
    "COM".to_string()
}

fn default_half_close() -> bool {
    false
}

fn default_buffer_size() -> usize {
    4096
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_tcp_port(),
        }
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            prefix: default_port_prefix(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            half_close: default_half_close(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl ServerSettings {
    /// Parsed TCP port number
    pub fn port_number(&self) -> SerBridgeResult<u16> {
        self.port.trim().parse::<u16>().map_err(|e| SerBridgeError::Config {
            message: format!("Invalid TCP port '{}': {}", self.port, e),
        })
    }

    /// Address the listener binds to, e.g. `0.0.0.0:8888`
    pub fn listen_addr(&self) -> SerBridgeResult<String> {
        let port = self.port_number()?;
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            // bare IPv6 literal
            Ok(format!("[{}]:{}", self.bind, port))
        } else {
            Ok(format!("{}:{}", self.bind, port))
        }
    }
}

impl BridgeConfig {
    /// Reject settings the bridge cannot run with
    pub fn validate(&self) -> SerBridgeResult<()> {
        if self.serial.device.trim().is_empty() {
            return Err(SerBridgeError::Config {
                message: "Serial device path must not be empty".to_string(),
            });
        }
        if self.serial.baud_rate == 0 {
            return Err(SerBridgeError::Config {
                message: "Baud rate must be a positive integer".to_string(),
            });
        }
        if self.relay.buffer_size == 0 {
            return Err(SerBridgeError::Config {
                message: "Relay buffer size must be a positive integer".to_string(),
            });
        }
        self.server.port_number()?;
        Ok(())
    }
}
