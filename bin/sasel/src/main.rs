//! Source address selection what-if tool.
//!
//! Describes a host in TOML (interfaces, addresses, routes, routers) and asks
//! which source address, interface and route a send would use.

mod cli;
mod logging;
mod topology;

use clap::Parser;
use color_eyre::eyre;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();
    logging::init_logging(&cli.logs)?;

    cli.run()
}
