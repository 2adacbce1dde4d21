use crate::batch::{run_allocation, AllocateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use dorm_alloc::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Dormitory Allocation Engine",
    about = "Serve or run compatibility-driven dormitory allocation from the command line",
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
    /// Allocate beds for a CSV roster and print the outcome
    Allocate(AllocateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Student roster CSV used to seed the in-memory campus
    #[arg(long)]
    pub(crate) students: Option<PathBuf>,
    /// Bed inventory CSV used to seed the in-memory campus
    #[arg(long)]
    pub(crate) beds: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Allocate(args) => run_allocation(args),
    }
}
