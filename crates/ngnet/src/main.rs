//! ngnet CLI entry point.

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("ngnet={level}").parse()?)
                .add_directive(format!("ngnet_graph={level}").parse()?),
        )
        .init();

    cli.execute()
}
