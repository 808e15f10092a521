// Relay module - Bidirectional forwarding between a client and a device
pub mod channel;
pub mod forwarder;
pub mod session;

pub use channel::{Channel, CloseSignal, StreamChannel};
pub use forwarder::{DeviceOpener, Relay};
pub use session::{Direction, RelaySession, SessionHandle, SessionId, SessionReport};
