use thiserror::Error;

/// SerBridge unified error type
#[derive(Error, Debug)]
pub enum SerBridgeError {
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error("Failed to open serial device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to setup listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl SerBridgeError {
    /// Whether the error must end the whole process rather than a single session.
    pub fn is_fatal(&self) -> bool {
        match self {
            SerBridgeError::Bind { .. }
            | SerBridgeError::Accept(_)
            | SerBridgeError::Enumeration(_)
            | SerBridgeError::Config { .. } => true,
            SerBridgeError::Network(_)
            | SerBridgeError::Open { .. }
            | SerBridgeError::InvalidInput(_)
            | SerBridgeError::Output(_) => false,
        }
    }
}

/// Port enumeration failures
#[derive(Error, Debug)]
pub enum EnumerationError {
    #[error("Failed to query serial ports: {0}")]
    Query(#[source] serialport::Error),

    #[error("No serial ports found!")]
    NoPorts,

    #[error("No serial ports matching '{prefix}' found ({skipped} other ports present)")]
    NoMatchingPorts { prefix: String, skipped: usize },
}

pub type SerBridgeResult<T> = Result<T, SerBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_are_fatal() {
        let bind = SerBridgeError::Bind {
            addr: "0.0.0.0:8888".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(bind.is_fatal());
        assert!(SerBridgeError::from(EnumerationError::NoPorts).is_fatal());
    }

    #[test]
    fn test_session_errors_are_not_fatal() {
        let open = SerBridgeError::Open {
            path: "/dev/missing".to_string(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device"),
        };
        assert!(!open.is_fatal());
        assert!(open.to_string().contains("/dev/missing"));

        let io: SerBridgeError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(!io.is_fatal());
    }

    #[test]
    fn test_no_matching_ports_message() {
        let error = EnumerationError::NoMatchingPorts {
            prefix: "/dev/cu.".to_string(),
            skipped: 3,
        };
        let display = error.to_string();
        assert!(display.contains("/dev/cu."));
        assert!(display.contains('3'));
    }
}
