use crate::core::relay::channel::Channel;
use crate::domain::config::RelaySettings;
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

pub type SessionId = String;

/// Copy direction within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Network connection to serial device
    ClientToDevice,
    /// Serial device to network connection
    DeviceToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToDevice => write!(f, "client->device"),
            Direction::DeviceToClient => write!(f, "device->client"),
        }
    }
}

/// Why a copy loop stopped
#[derive(Debug)]
pub enum StreamEnd {
    /// Source reported end-of-stream
    Eof,
    /// Source was closed by the other copy task
    Closed,
    ReadFailed(io::Error),
    WriteFailed(io::Error),
}

/// Outcome of one copy direction
#[derive(Debug)]
pub struct DirectionReport {
    pub direction: Direction,
    pub bytes: u64,
    pub end: StreamEnd,
}

/// Totals for a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub id: SessionId,
    pub client: String,
    pub device: String,
    pub client_to_device: u64,
    pub device_to_client: u64,
}

/// Closes both endpoints when dropped, whichever way the copy task exits.
struct CloseGuard {
    endpoints: Option<[Arc<dyn Channel>; 2]>,
}

impl CloseGuard {
    fn new(a: &Arc<dyn Channel>, b: &Arc<dyn Channel>) -> Self {
        Self {
            endpoints: Some([Arc::clone(a), Arc::clone(b)]),
        }
    }

    fn disarm(&mut self) {
        self.endpoints = None;
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if let Some(endpoints) = self.endpoints.take() {
            for endpoint in &endpoints {
                endpoint.close();
            }
        }
    }
}

/// A running relay between one client connection and one serial device
pub struct RelaySession;

impl RelaySession {
    /// Start both copy tasks and return without waiting for them.
    pub fn start(
        client: Arc<dyn Channel>,
        device: Arc<dyn Channel>,
        settings: &RelaySettings,
    ) -> SessionHandle {
        let id = format!("relay_{}", uuid::Uuid::new_v4().simple());
        let client_name = client.describe();
        let device_name = device.describe();
        let buffer_size = settings.buffer_size.max(1);

        info!(
            "Session '{}' started: {} <-> {}",
            id, client_name, device_name
        );

        let to_device = tokio::spawn(pump(
            id.clone(),
            Arc::clone(&client),
            Arc::clone(&device),
            Direction::ClientToDevice,
            buffer_size,
            settings.half_close,
        ));
        let to_client = tokio::spawn(pump(
            id.clone(),
            device,
            client,
            Direction::DeviceToClient,
            buffer_size,
            false,
        ));

        SessionHandle {
            id,
            client: client_name,
            device: device_name,
            to_device,
            to_client,
        }
    }
}

/// Handle to a started session
pub struct SessionHandle {
    id: SessionId,
    client: String,
    device: String,
    to_device: JoinHandle<DirectionReport>,
    to_client: JoinHandle<DirectionReport>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether both copy tasks have exited
    pub fn is_finished(&self) -> bool {
        self.to_device.is_finished() && self.to_client.is_finished()
    }

    /// Wait until both copy tasks exit
    pub async fn wait(self) -> SessionReport {
        let client_to_device = join_bytes(&self.id, self.to_device.await);
        let device_to_client = join_bytes(&self.id, self.to_client.await);

        info!(
            "Session '{}' ended: {} bytes to device, {} bytes to client",
            self.id, client_to_device, device_to_client
        );

        SessionReport {
            id: self.id,
            client: self.client,
            device: self.device,
            client_to_device,
            device_to_client,
        }
    }
}

fn join_bytes(id: &str, joined: Result<DirectionReport, tokio::task::JoinError>) -> u64 {
    match joined {
        Ok(report) => report.bytes,
        Err(e) => {
            error!("Session '{}' copy task failed: {}", id, e);
            0
        }
    }
}

async fn pump(
    id: SessionId,
    from: Arc<dyn Channel>,
    to: Arc<dyn Channel>,
    direction: Direction,
    buffer_size: usize,
    half_close: bool,
) -> DirectionReport {
    let mut guard = CloseGuard::new(&from, &to);
    let mut buffer = vec![0u8; buffer_size];
    let mut bytes = 0u64;

    let end = loop {
        let n = match from.read(&mut buffer).await {
            Ok(0) if from.is_closed() => break StreamEnd::Closed,
            Ok(0) => break StreamEnd::Eof,
            Ok(n) => n,
            Err(e) => break StreamEnd::ReadFailed(e),
        };

        trace!("[{}] {} {}", id, direction, hex::encode(&buffer[..n]));

        if let Err(e) = to.write_all(&buffer[..n]).await {
            break StreamEnd::WriteFailed(e);
        }
        bytes += n as u64;
        debug!("[{}] {} forwarded {} bytes", id, direction, n);
    };

    match &end {
        StreamEnd::Eof if half_close => {
            // The client only shut down its write side; the device may still talk.
            debug!("[{}] {} reached end-of-stream, keeping session open", id, direction);
            guard.disarm();
        }
        StreamEnd::Eof => debug!("[{}] {} reached end-of-stream", id, direction),
        StreamEnd::Closed => debug!("[{}] {} stopped, endpoint closed", id, direction),
        StreamEnd::ReadFailed(e) => warn!("[{}] {} read failed: {}", id, direction, e),
        StreamEnd::WriteFailed(e) => warn!("[{}] {} write failed: {}", id, direction, e),
    }

    drop(guard);

    DirectionReport {
        direction,
        bytes,
        end,
    }
}
