mod commands;
mod logging;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "starlift",
    version,
    about = "Retail transactions ETL: Snowflake to a BigQuery star schema"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract-transform-load pipeline (the default)
    Run,
    /// Verify warehouse connectivity and configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::execute().await,
        Commands::Check => commands::check::execute().await,
    }
}
