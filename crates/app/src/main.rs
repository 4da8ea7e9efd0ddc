//! Bazaar Maintenance CLI

use std::process;

use bazaar_app::{
    database::{self, Db},
    domain::want_lists::{PgWantListsService, WantListsService},
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bazaar-app", about = "Bazaar CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Cancel active want lists that no longer hold any queue entries
    Sweep(SweepArgs),
}

#[derive(Debug, Args)]
struct SweepArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    init_logging();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Sweep(args) => sweep(args).await,
    }
}

async fn sweep(args: SweepArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let service = PgWantListsService::new(Db::new(pool));

    let cancelled = service
        .cleanup_empty_want_lists()
        .await
        .map_err(|error| format!("failed to sweep want lists: {error}"))?;

    println!("cancelled_want_lists: {cancelled}");

    Ok(())
}
