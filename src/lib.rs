//! SerBridge Library
//!
//! Forwards a serial device to TCP clients. Each accepted connection opens
//! the device and relays bytes verbatim in both directions until either side
//! closes.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use core::relay::{
    Channel, DeviceOpener, Relay, RelaySession, SessionHandle, SessionReport, StreamChannel,
};
pub use domain::config::BridgeConfig;
pub use domain::error::{EnumerationError, SerBridgeError, SerBridgeResult};
pub use infrastructure::serial::{PortEntry, PortEnumerator, SerialChannel, SerialOpener};
pub use infrastructure::tcp::{Acceptor, TcpConnection};
