// Serial module - Serial device access and port enumeration
pub mod channel;
pub mod ports;

pub use channel::{SerialChannel, SerialOpener};
pub use ports::{filter_ports, PortEntry, PortEnumerator};
