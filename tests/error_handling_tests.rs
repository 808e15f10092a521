use serbridge::{EnumerationError, SerBridgeError, SerBridgeResult};
use std::error::Error;

/// Error handling and resilience tests
#[cfg(test)]
mod error_handling_tests {
    use super::*;

    fn open_error() -> SerBridgeError {
        SerBridgeError::Open {
            path: "/dev/cu.usbserial-foo".to_string(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "No such device"),
        }
    }

    #[test]
    fn test_error_types() {
        let errors = vec![
            SerBridgeError::Config { message: "Config error".to_string() },
            SerBridgeError::Enumeration(EnumerationError::NoPorts),
            open_error(),
            SerBridgeError::Accept(std::io::Error::new(std::io::ErrorKind::Other, "accept")),
            SerBridgeError::InvalidInput("Invalid input".to_string()),
            SerBridgeError::Output("Output error".to_string()),
        ];

        for error in errors {
            let display = error.to_string();
            assert!(!display.is_empty(), "Error display should not be empty");
        }

        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<SerBridgeError>();
    }

    #[test]
    fn test_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error: SerBridgeError = io_error.into();
        assert!(matches!(error, SerBridgeError::Network(_)));

        let error: SerBridgeError = EnumerationError::NoPorts.into();
        assert!(matches!(error, SerBridgeError::Enumeration(EnumerationError::NoPorts)));
    }

    #[test]
    fn test_open_error_chain() {
        let error = open_error();

        let mut current_error: &dyn Error = &error;
        let mut depth = 0;
        while let Some(source) = current_error.source() {
            current_error = source;
            depth += 1;
            if depth > 10 {
                break;
            }
        }

        assert!(depth > 0, "Open errors should carry the driver error as source");
    }

    #[test]
    fn test_open_error_message_names_device() {
        let display = open_error().to_string();
        assert!(display.contains("Failed to open serial device"));
        assert!(display.contains("/dev/cu.usbserial-foo"));
        assert!(display.contains("No such device"));
    }

    #[test]
    fn test_fatality_split() {
        // Setup failures end the process, session failures never do.
        assert!(SerBridgeError::Bind {
            addr: "0.0.0.0:8888".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        }
        .is_fatal());
        assert!(
            SerBridgeError::Accept(std::io::Error::new(std::io::ErrorKind::Other, "x")).is_fatal()
        );
        assert!(SerBridgeError::from(EnumerationError::NoMatchingPorts {
            prefix: "/dev/cu.".to_string(),
            skipped: 2,
        })
        .is_fatal());

        assert!(!open_error().is_fatal());
        assert!(!SerBridgeError::Network(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe"
        ))
        .is_fatal());
    }

    #[test]
    fn test_enumeration_errors_are_distinct() {
        let none = EnumerationError::NoPorts.to_string();
        let unmatched = EnumerationError::NoMatchingPorts {
            prefix: "/dev/cu.".to_string(),
            skipped: 4,
        }
        .to_string();

        assert_eq!(none, "No serial ports found!");
        assert_ne!(none, unmatched);
        assert!(unmatched.contains("/dev/cu."));
    }

    #[tokio::test]
    async fn test_async_error_propagation() {
        async fn failing_async_function() -> SerBridgeResult<()> {
            Err(open_error())
        }

        async fn calling_function() -> SerBridgeResult<()> {
            failing_async_function().await?;
            Ok(())
        }

        let error = calling_function().await.unwrap_err();
        assert!(matches!(error, SerBridgeError::Open { .. }));
    }

    #[test]
    fn test_error_size() {
        let error_size = std::mem::size_of::<SerBridgeError>();
        assert!(error_size <= 128, "SerBridgeError too large: {} bytes", error_size);
    }
}
