use crate::core::relay::channel::Channel;
use crate::core::relay::session::{RelaySession, SessionHandle};
use crate::domain::config::RelaySettings;
use crate::domain::error::SerBridgeResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Opens the device end of a relay session
#[async_trait]
pub trait DeviceOpener: Send + Sync {
    /// Open a fresh device channel for one session
    async fn open(&self) -> SerBridgeResult<Arc<dyn Channel>>;

    /// Device name used in logs
    fn describe(&self) -> String;
}

/// Pairs accepted connections with freshly opened devices
pub struct Relay {
    opener: Arc<dyn DeviceOpener>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(opener: Arc<dyn DeviceOpener>, settings: RelaySettings) -> Self {
        Self { opener, settings }
    }

    /// Open the device for `connection` and start forwarding.
    ///
    /// When the device cannot be opened the client is sent an `ERROR:` line,
    /// the connection is closed and the open error is returned. The error only
    /// concerns this connection.
    pub async fn attach(&self, connection: Arc<dyn Channel>) -> SerBridgeResult<SessionHandle> {
        match self.opener.open().await {
            Ok(device) => Ok(RelaySession::start(connection, device, &self.settings)),
            Err(e) => {
                warn!(
                    "Could not open {} for {}: {}",
                    self.opener.describe(),
                    connection.describe(),
                    e
                );
                let message = format!("ERROR: {}\r\n", e);
                // Best effort, the client may already be gone.
                let _ = connection.write_all(message.as_bytes()).await;
                connection.close();
                Err(e)
            }
        }
    }
}
