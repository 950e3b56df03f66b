use crate::demo::{run_demo, run_fee_command, run_ranking, DemoArgs, FeeArgs, RankArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lewis_fees::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "LEWIS",
    about = "Estimate construction-development fees and rank jurisdictions from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Calculate fees for one project in one jurisdiction
    Fees {
        #[command(subcommand)]
        command: FeesCommand,
    },
    /// Rank every active jurisdiction for a project
    Rank(RankArgs),
    /// Walk through a calculation, a report, and a ranking on the sample catalog
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
pub(crate) enum FeesCommand {
    /// Print the itemized fee breakdown
    Calculate(FeeArgs),
    /// Print the construction feasibility report
    Report(FeeArgs),
}

/// Catalog location overrides shared by every command.
#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Normalized fee table (CSV). Defaults to LEWIS_FEES_CSV, then the sample catalog.
    #[arg(long)]
    pub(crate) fees_csv: Option<PathBuf>,
    /// Jurisdiction table (CSV). Defaults to LEWIS_JURISDICTIONS_CSV.
    #[arg(long)]
    pub(crate) jurisdictions_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Fees { command } => run_fee_command(command),
        Command::Rank(args) => run_ranking(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
