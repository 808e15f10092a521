use crate::domain::error::EnumerationError;
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use tracing::debug;

/// A serial device found on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub path: String,
    pub kind: String,
}

/// Lists serial devices whose path starts with a platform prefix
#[derive(Debug, Clone)]
pub struct PortEnumerator {
    prefix: String,
}

impl PortEnumerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Query the host for serial ports. Every call re-queries.
    pub fn list(&self) -> Result<Vec<PortEntry>, EnumerationError> {
        let ports = serialport::available_ports().map_err(EnumerationError::Query)?;
        debug!("Host reported {} serial ports", ports.len());
        filter_ports(ports, &self.prefix)
    }
}

/// Keep ports whose name starts with `prefix`, sorted by path.
///
/// An empty host listing and a listing where nothing matches are reported as
/// different errors.
pub fn filter_ports(
    ports: Vec<SerialPortInfo>,
    prefix: &str,
) -> Result<Vec<PortEntry>, EnumerationError> {
    if ports.is_empty() {
        return Err(EnumerationError::NoPorts);
    }

    let total = ports.len();
    let mut entries: Vec<PortEntry> = ports
        .into_iter()
        .filter(|port| port.port_name.starts_with(prefix))
        .map(|port| PortEntry {
            kind: describe_port_type(&port.port_type),
            path: port.port_name,
        })
        .collect();

    if entries.is_empty() {
        return Err(EnumerationError::NoMatchingPorts {
            prefix: prefix.to_string(),
            skipped: total,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries.dedup_by(|a, b| a.path == b.path);
    Ok(entries)
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut kind = format!("USB {:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                kind.push(' ');
                kind.push_str(product);
            }
            kind
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "Unknown".to_string(),
    }
}
