pub mod cli;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();

    // RUST_LOG wins; otherwise --verbose picks debug over warn.
    let default_level = if command_line_interface.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(error) = command_line_interface.run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
