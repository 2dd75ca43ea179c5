use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Query the runtime type algebra from the command line.
#[derive(Parser, Debug)]
#[command(name = "rtype", version, about)]
pub struct CliArgs {
    /// JSON validation config (checked level, inspect limits, deep checks).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable coloured output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Is SUB a subtype of SUPER?
    Subtype {
        #[arg(value_name = "SUB")]
        sub: String,
        #[arg(value_name = "SUPER")]
        sup: String,
    },
    /// Print the canonical rendering of a type expression.
    Name {
        #[arg(value_name = "EXPR")]
        expr: String,
    },
    /// Validate a JSON value against a type expression.
    Valid {
        #[arg(value_name = "EXPR")]
        expr: String,
        #[arg(value_name = "JSON")]
        json: String,
        /// Check container elements, not just the container class.
        #[arg(long)]
        deep: bool,
    },
}
