use crate::core::relay::channel::{closed_error, Channel, CloseSignal};
use crate::core::relay::forwarder::DeviceOpener;
use crate::domain::config::SerialSettings;
use crate::domain::error::{SerBridgeError, SerBridgeResult};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// How long a blocking serial call waits before re-checking the close flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type PortSlot = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

enum Transfer<T> {
    Done(T),
    Idle,
    Closed,
    Failed(io::Error),
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted)
}

/// An opened serial device.
///
/// Reading and writing go through separate handles to the same device so the
/// two copy directions never wait on each other. Blocking calls run on the
/// blocking thread pool and time out every [`POLL_INTERVAL`] to notice a close.
pub struct SerialChannel {
    path: String,
    baud_rate: u32,
    reader: PortSlot,
    writer: PortSlot,
    closed: Arc<CloseSignal>,
}

impl SerialChannel {
    /// Open `path` at `baud_rate`, 8N1 without flow control.
    ///
    /// This blocks; call it from a blocking context.
    pub fn open(path: &str, baud_rate: u32) -> SerBridgeResult<Self> {
        let open_error = |source: serialport::Error| SerBridgeError::Open {
            path: path.to_string(),
            source,
        };

        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(open_error)?;
        let channel = Self::from_port(path, baud_rate, port).map_err(open_error)?;

        info!("Serial port {} opened at {} baud", path, baud_rate);
        Ok(channel)
    }

    /// Wrap an already configured port. Its timeout bounds how long a close
    /// can go unnoticed by a pending read or write.
    fn from_port(
        path: &str,
        baud_rate: u32,
        reader: Box<dyn SerialPort>,
    ) -> Result<Self, serialport::Error> {
        let writer = reader.try_clone()?;

        Ok(Self {
            path: path.to_string(),
            baud_rate,
            reader: Arc::new(Mutex::new(Some(reader))),
            writer: Arc::new(Mutex::new(Some(writer))),
            closed: Arc::new(CloseSignal::new()),
        })
    }

    async fn transfer<T, F>(&self, slot: &PortSlot, op: F) -> io::Result<Transfer<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SerialPort) -> Transfer<T> + Send + 'static,
    {
        let slot = Arc::clone(slot);
        let closed = Arc::clone(&self.closed);

        tokio::task::spawn_blocking(move || {
            let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if closed.is_closed() {
                guard.take();
                return Transfer::Closed;
            }
            match guard.as_mut() {
                Some(port) => op(&mut **port),
                None => Transfer::Closed,
            }
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

#[async_trait]
impl Channel for SerialChannel {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        loop {
            let outcome = self
                .transfer(&self.reader, move |port| {
                    let mut chunk = vec![0u8; len];
                    match port.read(&mut chunk) {
                        Ok(n) => {
                            chunk.truncate(n);
                            Transfer::Done(chunk)
                        }
                        Err(e) if is_retryable(&e) => Transfer::Idle,
                        Err(e) => Transfer::Failed(e),
                    }
                })
                .await?;

            match outcome {
                Transfer::Done(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    return Ok(chunk.len());
                }
                Transfer::Idle => continue,
                Transfer::Closed => return Ok(0),
                Transfer::Failed(e) => return Err(e),
            }
        }
    }

    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        loop {
            let data = buf.to_vec();
            let outcome = self
                .transfer(&self.writer, move |port| match port.write(&data) {
                    Ok(n) => Transfer::Done(n),
                    Err(e) if is_retryable(&e) => Transfer::Idle,
                    Err(e) => Transfer::Failed(e),
                })
                .await?;

            match outcome {
                Transfer::Done(n) => return Ok(n),
                Transfer::Idle => continue,
                Transfer::Closed => return Err(closed_error()),
                Transfer::Failed(e) => return Err(e),
            }
        }
    }

    fn close(&self) {
        if !self.closed.close() {
            return;
        }
        // A slot held by a blocking call is emptied by that call once it times out.
        for slot in [&self.reader, &self.writer] {
            if let Ok(mut port) = slot.try_lock() {
                port.take();
            }
        }
        debug!("Serial port {} closed", self.path);
    }

    fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.path, self.baud_rate)
    }
}

/// Opens the configured serial device for every new session
#[derive(Debug, Clone)]
pub struct SerialOpener {
    settings: SerialSettings,
}

impl SerialOpener {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DeviceOpener for SerialOpener {
    async fn open(&self) -> SerBridgeResult<Arc<dyn Channel>> {
        let path = self.settings.device.clone();
        let baud_rate = self.settings.baud_rate;

        let channel = tokio::task::spawn_blocking(move || SerialChannel::open(&path, baud_rate))
            .await
            .map_err(|e| SerBridgeError::Network(io::Error::new(io::ErrorKind::Other, e)))??;

        Ok(Arc::new(channel))
    }

    fn describe(&self) -> String {
        self.settings.device.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let result = SerialChannel::open("/dev/serbridge-does-not-exist", 9600);
        match result {
            Err(SerBridgeError::Open { path, .. }) => {
                assert_eq!(path, "/dev/serbridge-does-not-exist")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opening a missing device should fail"),
        }
    }

    #[tokio::test]
    async fn test_opener_reports_open_error() {
        let opener = SerialOpener::new(SerialSettings {
            device: "/dev/serbridge-does-not-exist".to_string(),
            baud_rate: 115200,
        });
        assert_eq!(opener.describe(), "/dev/serbridge-does-not-exist");

        let result = opener.open().await;
        assert!(matches!(result, Err(SerBridgeError::Open { .. })));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pty_transfer_and_close() {
        use serialport::TTYPort;
        use std::io::{Read, Write};

        let (mut master, mut slave) = TTYPort::pair().expect("pty pair");
        slave.set_timeout(POLL_INTERVAL).unwrap();
        master.set_timeout(Duration::from_secs(2)).unwrap();
        let channel = Arc::new(SerialChannel::from_port("pty", 9600, Box::new(slave)).unwrap());
        assert_eq!(channel.describe(), "pty @ 9600 baud");

        channel.write_all(b"hello").await.unwrap();
        let (mut master, sent) = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; 5];
            let result = master.read_exact(&mut buf).map(|_| buf);
            (master, result)
        })
        .await
        .unwrap();
        assert_eq!(&sent.unwrap(), b"hello");

        // Nothing arrives for a few poll intervals, so the read has to keep waiting.
        let reader = Arc::clone(&channel);
        let pending = tokio::spawn(async move {
            let mut received = Vec::new();
            let mut buf = [0u8; 16];
            while received.len() < 5 {
                let n = reader.read(&mut buf).await.unwrap();
                assert!(n > 0, "channel ended before the data arrived");
                received.extend_from_slice(&buf[..n]);
            }
            received
        });
        tokio::time::sleep(POLL_INTERVAL * 3).await;
        master.write_all(b"world").unwrap();
        let received = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, b"world");

        // A read blocked on a silent device is released by close.
        let reader = Arc::clone(&channel);
        let blocked = tokio::spawn(async move {
            let mut buf = [0u8; 16];
            reader.read(&mut buf).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        channel.close();
        channel.close();
        assert!(channel.is_closed());

        let n = tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .expect("close should release the pending read")
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
        assert!(channel.write(b"late").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_serial_path_fails() {
        // /dev/null opens but is not a terminal, so configuring it fails.
        let opener = SerialOpener::new(SerialSettings {
            device: "/dev/null".to_string(),
            baud_rate: 9600,
        });
        assert!(opener.open().await.is_err());
    }
}
