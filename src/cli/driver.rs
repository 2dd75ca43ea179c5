//! Runs a parsed command against a fresh type universe.

use anyhow::{Context, Result};
use rtype_sig::{TypeDatabase, ValidationConfig, ValidationContext, Value};
use rtype_solver::{are_equivalent, is_subtype_of, parse_type};
use tracing::debug;

use super::args::{CliArgs, Command};

/// What a command found, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Subtype {
        sub: String,
        sup: String,
        holds: bool,
        equivalent: bool,
    },
    Name(String),
    Valid {
        expected: String,
        value: String,
        /// `None` when the value is valid.
        mismatch: Option<String>,
    },
}

impl Outcome {
    /// Process exit status: 0 when the relation/validation holds.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Subtype { holds: false, .. } | Outcome::Valid { mismatch: Some(_), .. } => 1,
            _ => 0,
        }
    }
}

pub fn load_config(args: &CliArgs) -> Result<ValidationConfig> {
    let mut config = match &args.config {
        Some(path) => ValidationConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ValidationConfig::default(),
    };
    config
        .apply_env()
        .context("invalid rtype environment variable")?;
    Ok(config)
}

pub fn run(args: &CliArgs) -> Result<Outcome> {
    let config = load_config(args)?;
    execute(&args.command, config)
}

pub fn execute(command: &Command, mut config: ValidationConfig) -> Result<Outcome> {
    if let Command::Valid { deep: true, .. } = command {
        config.deep_container_checks = true;
    }
    let ctx = ValidationContext::new(config);
    let db = &ctx.types;
    let parse = |expr: &str| {
        parse_type(db, expr).with_context(|| format!("cannot parse type `{expr}`"))
    };

    match command {
        Command::Subtype { sub, sup } => {
            let (a, b) = (parse(sub)?, parse(sup)?);
            let holds = is_subtype_of(db, a, b);
            debug!(sub = %sub, sup = %sup, holds, "subtype query");
            Ok(Outcome::Subtype {
                sub: db.name_of(a).to_string(),
                sup: db.name_of(b).to_string(),
                holds,
                equivalent: are_equivalent(db, a, b),
            })
        }
        Command::Name { expr } => Ok(Outcome::Name(db.name_of(parse(expr)?).to_string())),
        Command::Valid { expr, json, .. } => {
            let ty = parse(expr)?;
            let parsed: serde_json::Value =
                serde_json::from_str(json).with_context(|| format!("invalid JSON `{json}`"))?;
            let value = Value::from_json(&parsed);
            let mismatch = (!ctx.is_valid(ty, &value)).then(|| ctx.mismatch_message(ty, &value));
            Ok(Outcome::Valid {
                expected: db.name_of(ty).to_string(),
                value: value.inspect(db.classes(), &ctx.config.inspect),
                mismatch,
            })
        }
    }
}
