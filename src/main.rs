//! pressroom CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pressroom::cli::{Cli, execute};

#[allow(clippy::print_stdout)]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "pressroom=warn",
            1 => "pressroom=info",
            2 => "pressroom=debug",
            _ => "pressroom=trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = execute(&cli)?;
    print!("{output}");

    Ok(())
}
