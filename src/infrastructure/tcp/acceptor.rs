use crate::core::relay::channel::Channel;
use crate::core::relay::forwarder::Relay;
use crate::domain::error::{SerBridgeError, SerBridgeResult};
use crate::infrastructure::tcp::connection::TcpConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

/// Accepts TCP clients and gives each one its own relay session
pub struct Acceptor {
    listener: TcpListener,
    bind_addr: SocketAddr,
    relay: Arc<Relay>,
}

impl Acceptor {
    /// Bind the listening socket
    pub async fn bind(addr: &str, relay: Relay) -> SerBridgeResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| SerBridgeError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let bind_addr = listener.local_addr().map_err(|source| SerBridgeError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        info!("Listening on {}", bind_addr);

        Ok(Self {
            listener,
            bind_addr,
            relay: Arc::new(relay),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Accept connections until accepting fails.
    ///
    /// Sessions run on their own tasks; the loop never waits for them. Only an
    /// accept failure returns, and the caller should treat it as fatal.
    pub async fn serve(self) -> SerBridgeResult<()> {
        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .map_err(SerBridgeError::Accept)?;

            info!("Accepted connection from {}", addr);

            let relay = Arc::clone(&self.relay);
            tokio::spawn(async move {
                handle_connection(relay, stream, addr).await;
            });
        }
    }
}

async fn handle_connection(relay: Arc<Relay>, stream: TcpStream, addr: SocketAddr) {
    let connection: Arc<dyn Channel> = match TcpConnection::from_tcp(stream) {
        Ok(connection) => Arc::new(connection),
        Err(e) => {
            warn!("Dropping connection from {}: {}", addr, e);
            return;
        }
    };

    match relay.attach(connection).await {
        Ok(session) => {
            let report = session.wait().await;
            info!(
                "Connection from {} closed ({} bytes in, {} bytes out)",
                addr, report.client_to_device, report.device_to_client
            );
        }
        Err(e) => {
            error!("Session for {} not started: {}", addr, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::relay::forwarder::DeviceOpener;
    use crate::domain::config::RelaySettings;
    use async_trait::async_trait;

    struct NoDevice;

    #[async_trait]
    impl DeviceOpener for NoDevice {
        async fn open(&self) -> SerBridgeResult<Arc<dyn Channel>> {
            Err(SerBridgeError::Open {
                path: "none".to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "none"),
            })
        }

        fn describe(&self) -> String {
            "none".to_string()
        }
    }

    fn relay() -> Relay {
        Relay::new(Arc::new(NoDevice), RelaySettings::default())
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let acceptor = Acceptor::bind("127.0.0.1:0", relay()).await.unwrap();
        assert_ne!(acceptor.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_bind_error() {
        let first = Acceptor::bind("127.0.0.1:0", relay()).await.unwrap();
        let addr = first.local_addr().to_string();

        let second = Acceptor::bind(&addr, relay()).await;
        match second {
            Err(e @ SerBridgeError::Bind { .. }) => assert!(e.is_fatal()),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("second bind on {} should fail", addr),
        }
    }
}
