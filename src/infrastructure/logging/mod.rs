// Logging module - Logging infrastructure
use crate::domain::error::{SerBridgeError, SerBridgeResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the configured level; `verbose` forces debug
pub fn filter_directive(log_level: &str, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        match log_level.to_ascii_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "info" => "info",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        }
    };
    format!("serbridge={},warn", level)
}

/// Initialize logging system. `RUST_LOG` takes precedence over `log_level`.
pub fn init_logging(log_level: &str, verbose: bool) -> SerBridgeResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| SerBridgeError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("SerBridge logging system initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("info", false), "serbridge=info,warn");
        assert_eq!(filter_directive("TRACE", false), "serbridge=trace,warn");
        assert_eq!(filter_directive("bogus", false), "serbridge=info,warn");
        assert_eq!(filter_directive("error", true), "serbridge=debug,warn");
    }

    #[test]
    fn test_logging_init() {
        // A second initialization in the same process reports an error instead of panicking.
        let _ = init_logging("info", false);
        assert!(init_logging("info", false).is_err());
    }
}
