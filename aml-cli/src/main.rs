use aml_cli::commands::{self, Command};
use aml_cli::context::{Context, GlobalArgs};
use aml_cli::errors::CliError;
use aml_cli::output::OutputFormat;
use clap::Parser;

#[derive(Parser)]
#[command(name = "aml")]
#[command(about = "Command-line interface for the agent memory and learning store")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Enable debug-level tracing.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let ctx = Context::open(&cli.global)?;
    let format = cli.global.format;
    let result = commands::dispatch(cli.command, &ctx, format);
    ctx.store.audit().flush()?;

    if let Err(err) = result {
        report_error(&err, format);
        std::process::exit(1);
    }
    Ok(())
}

fn report_error(err: &anyhow::Error, format: OutputFormat) {
    match err.downcast_ref::<aml_core::Error>() {
        Some(aml_err) => {
            let cli_err = CliError::from(aml_err);
            match format {
                OutputFormat::Human => eprintln!("error: {cli_err}"),
                OutputFormat::Json => {
                    if let Ok(text) = serde_json::to_string_pretty(&cli_err) {
                        eprintln!("{text}");
                    }
                }
            }
        }
        None => eprintln!("error: {err:#}"),
    }
}
