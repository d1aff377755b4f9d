//! `aml config` subcommands: parse and validate a TOML configuration file.

use crate::output::{print, HumanRender, OutputFormat};
use aml_core::types::config::{AmlConfig, ConfigError};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, clap::Subcommand)]
pub enum ConfigCmd {
    /// Parses and validates a TOML configuration file.
    Validate {
        #[arg(long)]
        file: PathBuf,
    },
    /// Prints the built-in default configuration as TOML-shaped JSON.
    ShowDefaults,
}

#[derive(Serialize)]
struct ValidationOutcome {
    valid: bool,
    errors: Vec<ConfigError>,
}

impl HumanRender for ValidationOutcome {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        if self.valid {
            writeln!(w, "valid")?;
        } else {
            writeln!(w, "invalid: {} error(s)", self.errors.len())?;
            for e in &self.errors {
                writeln!(w, " {}: {}", e.path, e.message)?;
            }
        }
        Ok(())
    }
}

impl HumanRender for AmlConfig {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(w, "{}", serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

pub fn run(cmd: ConfigCmd, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Validate { file } => {
            let text = std::fs::read_to_string(&file)?;
            let outcome = match AmlConfig::from_toml_str(&text) {
                Ok(_config) => ValidationOutcome { valid: true, errors: Vec::new() },
                Err(errors) => ValidationOutcome { valid: false, errors },
            };
            print(&outcome, format)
        }
        ConfigCmd::ShowDefaults => print(&AmlConfig::default(), format),
    }
}
