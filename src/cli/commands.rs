use crate::cli::args::{Args, ConfigCommand, Mode};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::relay::Relay;
use crate::domain::config::BridgeConfig;
use crate::domain::error::{SerBridgeError, SerBridgeResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{PortEnumerator, SerialOpener};
use crate::infrastructure::tcp::Acceptor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Execute CLI command
pub async fn execute_command(args: Args) -> SerBridgeResult<()> {
    let writer = ConsoleWriter::new(args.output.clone());

    let config_manager = ConfigManager::new();
    let mut config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };
    args.bridge.apply(&mut config);

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    match args.mode() {
        Mode::Serve => {
            config.validate()?;
            run_server(Arc::new(config)).await
        }
        Mode::List => {
            let enumerator = PortEnumerator::new(config.ports.prefix.clone());
            let ports = enumerator.list()?;
            writer.write_ports(&ports)?;
            Ok(())
        }
        Mode::Config => {
            let command = match args.command {
                Some(crate::cli::args::Command::Config(config_args)) => config_args.command,
                _ => ConfigCommand::Show,
            };
            execute_config_command(command, &writer, &config, &config_manager)
        }
        Mode::Version => {
            writer.write_message(&format!("serbridge {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Bind the listener and forward the configured device to every client.
///
/// Only returns on a setup or accept failure.
pub async fn run_server(config: Arc<BridgeConfig>) -> SerBridgeResult<()> {
    let addr = config.server.listen_addr()?;
    let opener = Arc::new(SerialOpener::new(config.serial.clone()));
    let relay = Relay::new(opener, config.relay.clone());

    let acceptor = Acceptor::bind(&addr, relay).await?;
    info!(
        "Forwarding {} at {} baud to tcp://{}",
        config.serial.device,
        config.serial.baud_rate,
        acceptor.local_addr()
    );

    acceptor.serve().await
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &BridgeConfig,
    config_manager: &ConfigManager,
) -> SerBridgeResult<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Init { dir } => {
            let dir = match dir {
                Some(dir) => PathBuf::from(dir),
                None => std::env::current_dir().map_err(|e| SerBridgeError::Config {
                    message: format!("Failed to get current directory: {}", e),
                })?,
            };
            let path = config_manager.init_project_config(&dir)?;
            writer.write_message(&format!(
                "Project configuration initialized at '{}'",
                path.display()
            ))?;
            Ok(())
        }
    }
}
