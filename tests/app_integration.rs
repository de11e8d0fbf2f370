use coinfolio::AppCommand;
use coinfolio::core::ledger::Ledger;
use coinfolio::core::{PortfolioSession, SessionEvent, SyncOutcome, SyncState};
use coinfolio::providers::coingecko::CoinGeckoProvider;
use coinfolio::store::{DiskBlobStore, MemoryBlobStore};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn prices_response(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(body.to_string())
    }
}

const PRICES: &str = r#"{
    "bitcoin": {"usd": 15000.0, "usd_24h_change": 3.2},
    "ethereum": {"usd": 1800.0, "usd_24h_change": -0.8}
}"#;

/// Writes a config pointing at `base_url` with data kept inside `data_dir`.
fn write_config(data_dir: &TempDir, base_url: &str) -> tempfile::NamedTempFile {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
        providers:
          coingecko:
            base_url: {}
        refresh_interval_secs: 300
        market_assets:
          - bitcoin
          - ethereum
          - cardano
        data_path: {}
    "#,
        base_url,
        data_dir.path().display()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");
    config_file
}

fn stored_ledger(data_dir: &TempDir) -> Ledger {
    let store = DiskBlobStore::open(&data_dir.path().join("store")).expect("Failed to open store");
    Ledger::load(Arc::new(store))
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_mock_server(test_utils::prices_response(PRICES)).await;
    let data_dir = TempDir::new().unwrap();
    let config_file = write_config(&data_dir, &mock_server.uri());
    let config_path = config_file.path().to_str().unwrap();

    for (asset, amount, price) in [
        ("bitcoin", 2.0, 10000.0),
        ("ethereum", 5.0, 2000.0),
        ("bitcoin", 1.0, 13000.0),
    ] {
        let result = coinfolio::run_command(
            AppCommand::Add {
                asset: asset.to_string(),
                amount,
                price,
                offline: false,
            },
            Some(config_path),
        )
        .await;
        assert!(result.is_ok(), "Add failed with: {:?}", result.err());
    }

    let result = coinfolio::run_command(AppCommand::Summary, Some(config_path)).await;
    assert!(result.is_ok(), "Summary failed with: {:?}", result.err());

    let ledger = stored_ledger(&data_dir);
    info!(?ledger, "Stored ledger");
    assert_eq!(ledger.asset_ids(), vec!["bitcoin", "ethereum"]);
    let bitcoin = ledger.get("bitcoin").unwrap();
    assert_eq!(bitcoin.amount, 3.0);
    assert_eq!(bitcoin.avg_cost, 11000.0);
}

#[test_log::test(tokio::test)]
async fn test_remove_flow() {
    let mock_server = test_utils::create_mock_server(test_utils::prices_response(PRICES)).await;
    let data_dir = TempDir::new().unwrap();
    let config_file = write_config(&data_dir, &mock_server.uri());
    let config_path = config_file.path().to_str().unwrap();

    coinfolio::run_command(
        AppCommand::Add {
            asset: "ethereum".to_string(),
            amount: 1.5,
            price: 2100.0,
            offline: true,
        },
        Some(config_path),
    )
    .await
    .unwrap();

    for _ in 0..2 {
        let result = coinfolio::run_command(
            AppCommand::Remove {
                asset: "ethereum".to_string(),
                offline: false,
            },
            Some(config_path),
        )
        .await;
        assert!(result.is_ok(), "Remove failed with: {:?}", result.err());
    }

    assert!(stored_ledger(&data_dir).is_empty());
}

#[test_log::test(tokio::test)]
async fn test_invalid_purchase_is_rejected() {
    let mock_server = test_utils::create_mock_server(test_utils::prices_response(PRICES)).await;
    let data_dir = TempDir::new().unwrap();
    let config_file = write_config(&data_dir, &mock_server.uri());
    let config_path = config_file.path().to_str().unwrap();

    let result = coinfolio::run_command(
        AppCommand::Add {
            asset: "notacoin".to_string(),
            amount: 1.0,
            price: 1.0,
            offline: true,
        },
        Some(config_path),
    )
    .await;

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("unknown asset: notacoin"));
    assert!(stored_ledger(&data_dir).is_empty());
}

#[test_log::test(tokio::test)]
async fn test_summary_survives_price_service_outage() {
    let mock_server =
        test_utils::create_mock_server(wiremock::ResponseTemplate::new(503)).await;
    let data_dir = TempDir::new().unwrap();
    let config_file = write_config(&data_dir, &mock_server.uri());
    let config_path = config_file.path().to_str().unwrap();

    coinfolio::run_command(
        AppCommand::Add {
            asset: "cardano".to_string(),
            amount: 250.0,
            price: 0.45,
            offline: false,
        },
        Some(config_path),
    )
    .await
    .unwrap();

    let result = coinfolio::run_command(AppCommand::Summary, Some(config_path)).await;
    assert!(result.is_ok(), "Summary failed with: {:?}", result.err());
    assert_eq!(stored_ledger(&data_dir).len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_market_with_mock() {
    let mock_server = test_utils::create_mock_server(test_utils::prices_response(PRICES)).await;
    let data_dir = TempDir::new().unwrap();
    let config_file = write_config(&data_dir, &mock_server.uri());

    let result = coinfolio::run_command(
        AppCommand::Market,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Market failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_session_against_mock_price_service() {
    let mock_server = test_utils::create_mock_server(test_utils::prices_response(PRICES)).await;
    let provider = Arc::new(CoinGeckoProvider::new(&mock_server.uri()).unwrap());
    let session = PortfolioSession::open(Arc::new(MemoryBlobStore::new()), provider);
    let mut events = session.subscribe();

    session.add_purchase("bitcoin", 2.0, 10000.0).unwrap();
    session.add_purchase("bitcoin", 1.0, 13000.0).unwrap();
    session.add_purchase("dogecoin", 1000.0, 0.1).unwrap();

    let SyncOutcome::Refreshed(valuation) = session.sync().await.unwrap() else {
        panic!("expected prices to be refreshed");
    };
    assert_eq!(session.sync_state(), SyncState::Idle);

    // bitcoin: 3 @ 11000 now worth 15000; dogecoin has no quote and stays at cost
    assert_eq!(valuation.holdings[0].current_value, 45000.0);
    assert_eq!(valuation.holdings[0].profit_loss, 12000.0);
    assert!(!valuation.holdings[1].priced);
    assert_eq!(valuation.holdings[1].profit_loss, 0.0);
    assert_eq!(valuation.total_profit_loss, 12000.0);
    assert_eq!(session.quote("bitcoin").unwrap().change_24h, Some(3.2));

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(SessionEvent::ValuationChanged(valuation)));
}
