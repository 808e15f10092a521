// TCP module - Listener and client connections
pub mod acceptor;
pub mod connection;

pub use acceptor::Acceptor;
pub use connection::TcpConnection;
