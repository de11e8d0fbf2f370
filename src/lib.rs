pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{BlobStore, PortfolioSession, PriceProvider};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Assets,
    Add {
        asset: String,
        amount: f64,
        price: f64,
        offline: bool,
    },
    Remove {
        asset: String,
        offline: bool,
    },
    Summary,
    Watch,
    Market,
}

fn open_session(config: &AppConfig, provider: Arc<dyn PriceProvider>) -> Result<PortfolioSession> {
    let store_path = config.default_data_path()?.join("store");
    let store: Arc<dyn BlobStore> = Arc::new(store::DiskBlobStore::open(&store_path)?);
    Ok(PortfolioSession::open(store, provider))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Coinfolio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider: Arc<dyn PriceProvider> = Arc::new(
        providers::coingecko::CoinGeckoProvider::new(config.coingecko_base_url())?,
    );

    match command {
        AppCommand::Assets => {
            println!("{}", cli::portfolio::list_assets());
            Ok(())
        }
        AppCommand::Market => cli::market::run(provider.as_ref(), &config.market_assets).await,
        AppCommand::Add {
            asset,
            amount,
            price,
            offline,
        } => {
            let session = open_session(&config, provider)?;
            cli::portfolio::add(&session, &asset, amount, price, offline).await
        }
        AppCommand::Remove { asset, offline } => {
            let session = open_session(&config, provider)?;
            cli::portfolio::remove(&session, &asset, offline).await
        }
        AppCommand::Summary => {
            let session = open_session(&config, provider)?;
            cli::portfolio::summary(&session).await
        }
        AppCommand::Watch => {
            let session = Arc::new(open_session(&config, Arc::clone(&provider))?);
            cli::portfolio::watch(
                session,
                provider,
                &config.market_assets,
                config.refresh_interval(),
            )
            .await
        }
    }
}
