// SerBridge - Serial port to TCP forwarder
use clap::Parser;
use serbridge::cli::{execute_command, Args, ConsoleWriter, OutputWriter};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let writer = ConsoleWriter::new(args.output.clone());

    if let Err(e) = execute_command(args).await {
        if writer.write_error(&e.to_string()).is_err() {
            eprintln!("Error: {}", e);
        }
        // Setup failures exit 1, anything else exits 2.
        std::process::exit(if e.is_fatal() { 1 } else { 2 });
    }
}
