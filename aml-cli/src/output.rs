//! Output formatting: human-readable summaries or pretty JSON, selected by
//! the top-level `--format` flag.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, one summary line or a short block per item.
    Human,
    /// Pretty-printed JSON, for scripting.
    Json,
}

/// Types that know how to render themselves for [`OutputFormat::Human`].
/// JSON rendering is generic over any `Serialize` type.
pub trait HumanRender {
    /// Writes a human-readable rendering to `writer`.
    fn render_human<W: Write>(&self, writer: W) -> anyhow::Result<()>;
}

/// Prints `value` to stdout in the requested format.
pub fn print<T: HumanRender + Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => value.render_human(io::stdout()),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), value)?;
            println!();
            Ok(())
        }
    }
}
