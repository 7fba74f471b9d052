use crate::demo::{run_demo, run_roster_report, DemoArgs, RosterArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gatherly::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Gatherly",
    about = "Run the Gatherly event staffing service or inspect rosters from the command line",
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
    /// Print a roster report for an exported event CSV
    Roster(RosterArgs),
    /// Walk through onboarding, applications, adjudication and transportation
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory store with events from a CSV export
    #[arg(long)]
    pub(crate) events: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Roster(args) => run_roster_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
