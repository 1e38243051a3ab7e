use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use workbook_search::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli_args = cli::Cli::parse();
    let state = cli_args.app_state()?;
    match cli::run_command(state, cli_args.command).await {
        Ok(payload) => cli::output::emit_value(&payload, cli_args.compact),
        Err(error) => {
            cli::output::emit_value(&cli::output::error_value(&error), cli_args.compact)?;
            Err(error)
        }
    }
}
