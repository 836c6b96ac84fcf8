pub mod cli;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let command_line_interface = cli::CommandLineInterface::load();

    // stderr only: stdout carries generated code
    let default_level = if command_line_interface.verbose() { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("config_bindgen={default_level}"))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    command_line_interface.run()
}
