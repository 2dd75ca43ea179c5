#![allow(clippy::print_stdout)]

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use rtype::cli::args::CliArgs;
use rtype::cli::driver;
use rtype::cli::reporter::Reporter;

fn main() -> Result<()> {
    // No-op unless RTYPE_LOG or RUST_LOG is set.
    rtype::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let outcome = driver::run(&args)?;

    let color = !args.no_color && std::io::stdout().is_terminal();
    println!("{}", Reporter::new(color).render(&outcome));
    std::process::exit(outcome.exit_code());
}
