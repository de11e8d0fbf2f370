use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinfolio::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinfolio::AppCommand {
    fn from(cmd: Commands) -> coinfolio::AppCommand {
        match cmd {
            Commands::Assets => coinfolio::AppCommand::Assets,
            Commands::Add {
                asset,
                amount,
                price,
                offline,
            } => coinfolio::AppCommand::Add {
                asset,
                amount,
                price,
                offline,
            },
            Commands::Remove { asset, offline } => coinfolio::AppCommand::Remove { asset, offline },
            Commands::Summary => coinfolio::AppCommand::Summary,
            Commands::Watch => coinfolio::AppCommand::Watch,
            Commands::Market => coinfolio::AppCommand::Market,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List supported assets
    Assets,
    /// Record a purchase, merging it with an existing holding
    Add {
        /// Asset id, e.g. bitcoin
        asset: String,
        /// Units bought
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        /// Price paid per unit in USD
        #[arg(allow_negative_numbers = true)]
        price: f64,
        /// Do not fetch current prices afterwards
        #[arg(long)]
        offline: bool,
    },
    /// Remove a holding
    Remove {
        /// Asset id, e.g. bitcoin
        asset: String,
        /// Do not fetch current prices afterwards
        #[arg(long)]
        offline: bool,
    },
    /// Display holdings with current prices and profit/loss
    Summary,
    /// Display holdings and refresh prices periodically
    Watch,
    /// Display current prices of popular assets
    Market,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coinfolio::cli::setup::setup(),
        Some(cmd) => coinfolio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
