use crate::core::relay::channel::StreamChannel;
use std::io;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// An accepted TCP peer as a relay endpoint
pub type TcpConnection = StreamChannel<OwnedReadHalf, OwnedWriteHalf>;

impl StreamChannel<OwnedReadHalf, OwnedWriteHalf> {
    /// Wrap an accepted stream. The peer address becomes the channel label.
    pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        let peer: SocketAddr = stream.peer_addr()?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", peer, e);
        }
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer, peer.to_string()))
    }
}
