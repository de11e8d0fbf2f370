//! A portfolio session: ledger, price cache and price refreshes behind one owner.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::{PortfolioError, SyncFailure};
use super::holding::Holding;
use super::ledger::Ledger;
use super::price::{PriceCache, PriceProvider, Quote};
use super::store::BlobStore;
use super::sync::{SkipReason, SyncController, SyncOutcome, SyncState};
use super::valuation::{self, PortfolioValuation};

const EVENT_CAPACITY: usize = 16;

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The ledger or the price cache changed.
    ValuationChanged(PortfolioValuation),
    /// A price refresh failed; prices keep their previous values.
    SyncFailed(SyncFailure),
}

struct Portfolio {
    ledger: Ledger,
    prices: PriceCache,
}

impl Portfolio {
    fn valuation(&self) -> PortfolioValuation {
        valuation::value_portfolio(self.ledger.list(), &self.prices)
    }
}

pub struct PortfolioSession {
    state: Mutex<Portfolio>,
    controller: SyncController,
    provider: Arc<dyn PriceProvider>,
    events: broadcast::Sender<SessionEvent>,
}

impl PortfolioSession {
    /// Opens a session over the ledger kept in `store`.
    pub fn open(store: Arc<dyn BlobStore>, provider: Arc<dyn PriceProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(Portfolio {
                ledger: Ledger::load(store),
                prices: PriceCache::new(),
            }),
            controller: SyncController::new(),
            provider,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Portfolio> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, event: SessionEvent) {
        // No receivers is fine, callers also get the result directly.
        if self.events.send(event).is_err() {
            debug!("No session event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Records a purchase. See [`Ledger::add_or_merge_purchase`].
    pub fn add_purchase(
        &self,
        asset_id: &str,
        amount: f64,
        price: f64,
    ) -> Result<Holding, PortfolioError> {
        let (result, valuation) = {
            let mut state = self.lock();
            let result = state.ledger.add_or_merge_purchase(asset_id, amount, price);
            (result, state.valuation())
        };
        match &result {
            Err(PortfolioError::Validation(e)) => warn!(asset = asset_id, "Rejected purchase: {e}"),
            _ => self.notify(SessionEvent::ValuationChanged(valuation)),
        }
        result
    }

    pub fn remove(&self, asset_id: &str) -> Result<bool, PortfolioError> {
        let (result, valuation) = {
            let mut state = self.lock();
            let result = state.ledger.remove(asset_id);
            (result, state.valuation())
        };
        if !matches!(result, Ok(false)) {
            self.notify(SessionEvent::ValuationChanged(valuation));
        }
        result
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.lock().ledger.list().to_vec()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ledger.is_empty()
    }

    pub fn valuation(&self) -> PortfolioValuation {
        self.lock().valuation()
    }

    pub fn quote(&self, asset_id: &str) -> Option<Quote> {
        self.lock().prices.quote(asset_id).copied()
    }

    pub fn prices_updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.lock().prices.updated_at()
    }

    pub fn sync_state(&self) -> SyncState {
        self.controller.state()
    }

    /// Fetches current prices for every held asset and revalues the portfolio.
    ///
    /// Does nothing for an empty ledger or while another fetch is in flight.
    /// On failure the price cache is left as it was. There is no timeout beyond
    /// the HTTP client's own; a hung request keeps the session in `Fetching`.
    pub async fn sync(&self) -> Result<SyncOutcome, SyncFailure> {
        let asset_ids = self.lock().ledger.asset_ids();
        if asset_ids.is_empty() {
            debug!("Portfolio is empty, skipping price sync");
            return Ok(SyncOutcome::Skipped(SkipReason::EmptyLedger));
        }
        let Some(guard) = self.controller.try_begin() else {
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyFetching));
        };

        info!(assets = asset_ids.len(), "Fetching current prices");
        let result = self.provider.fetch_quotes(&asset_ids).await;

        match result {
            Ok(quotes) => {
                let missing: Vec<&String> =
                    asset_ids.iter().filter(|id| !quotes.contains_key(*id)).collect();
                if !missing.is_empty() {
                    debug!(?missing, "No price returned, valuing at cost");
                }

                let valuation = {
                    let mut state = self.lock();
                    state.prices.replace_all(quotes);
                    state.valuation()
                };
                drop(guard);
                info!(total_value = valuation.total_value, "Prices updated");
                self.notify(SessionEvent::ValuationChanged(valuation.clone()));
                Ok(SyncOutcome::Refreshed(valuation))
            }
            Err(e) => {
                let failure = SyncFailure::from(e);
                drop(guard);
                warn!("Price sync failed: {}", failure.cause);
                self.notify(SessionEvent::SyncFailed(failure.clone()));
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryBlobStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Serves fixed prices, or fails when `fail` is set.
    struct MockProvider {
        prices: HashMap<String, f64>,
        fail: bool,
        calls: AtomicUsize,
        requested: Mutex<Vec<Vec<String>>>,
    }

    impl MockProvider {
        fn with_prices(prices: &[(&str, f64)]) -> Self {
            Self {
                prices: prices.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                fail: false,
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::with_prices(&[])
            }
        }
    }

    #[async_trait]
    impl PriceProvider for MockProvider {
        async fn fetch_quotes(&self, asset_ids: &[String]) -> Result<HashMap<String, Quote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(asset_ids.to_vec());
            if self.fail {
                return Err(anyhow!("connection reset"));
            }
            Ok(asset_ids
                .iter()
                .filter_map(|id| self.prices.get(id).map(|p| (id.clone(), Quote::new(*p))))
                .collect())
        }
    }

    /// Blocks every fetch until released.
    struct GatedProvider {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceProvider for GatedProvider {
        async fn fetch_quotes(&self, asset_ids: &[String]) -> Result<HashMap<String, Quote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(asset_ids
                .iter()
                .map(|id| (id.clone(), Quote::new(1.0)))
                .collect())
        }
    }

    /// Reads as empty, rejects every write.
    struct ReadOnlyStore;

    impl BlobStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
    }

    fn open(provider: Arc<dyn PriceProvider>) -> PortfolioSession {
        PortfolioSession::open(Arc::new(MemoryBlobStore::new()), provider)
    }

    #[tokio::test]
    async fn test_sync_empty_ledger_is_noop() {
        let provider = Arc::new(MockProvider::with_prices(&[]));
        let session = open(provider.clone());

        let outcome = session.sync().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::EmptyLedger));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.sync_state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_sync_updates_prices_and_valuation() {
        let provider = Arc::new(MockProvider::with_prices(&[("bitcoin", 15000.0)]));
        let session = open(provider.clone());
        session.add_purchase("bitcoin", 2.0, 10000.0).unwrap();
        session.add_purchase("ethereum", 5.0, 2000.0).unwrap();
        session.add_purchase("bitcoin", 1.0, 13000.0).unwrap();
        let mut events = session.subscribe();

        let SyncOutcome::Refreshed(valuation) = session.sync().await.unwrap() else {
            panic!("expected a refresh");
        };

        assert_eq!(
            provider.requested.lock().unwrap().as_slice(),
            &[vec!["bitcoin".to_string(), "ethereum".to_string()]]
        );
        assert_eq!(session.quote("bitcoin").unwrap().unit_price, 15000.0);
        assert!(session.quote("ethereum").is_none());
        assert_eq!(valuation.total_value, 3.0 * 15000.0 + 10000.0);
        assert_eq!(valuation.holdings[1].profit_loss, 0.0);
        assert_eq!(session.sync_state(), SyncState::Idle);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::ValuationChanged(valuation));
    }

    #[tokio::test]
    async fn test_sync_failure_keeps_prices_and_reports_once() {
        let session = open(Arc::new(MockProvider::with_prices(&[("ethereum", 2500.0)])));
        session.add_purchase("ethereum", 5.0, 2000.0).unwrap();
        session.sync().await.unwrap();
        let updated_at = session.prices_updated_at();

        // Same ledger, but the price service is now down.
        let session = PortfolioSession {
            provider: Arc::new(MockProvider::failing()),
            ..session
        };
        let mut events = session.subscribe();

        let failure = session.sync().await.unwrap_err();
        assert!(failure.cause.contains("connection reset"));
        assert_eq!(session.sync_state(), SyncState::Idle);
        assert_eq!(session.quote("ethereum").unwrap().unit_price, 2500.0);
        assert_eq!(session.prices_updated_at(), updated_at);

        assert_eq!(events.recv().await.unwrap(), SessionEvent::SyncFailed(failure));
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_overlapping_sync_is_dropped() {
        let provider = Arc::new(GatedProvider {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = Arc::new(open(provider.clone()));
        session.add_purchase("litecoin", 4.0, 80.0).unwrap();

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.sync().await }
        });
        while session.sync_state() != SyncState::Fetching {
            tokio::task::yield_now().await;
        }

        let second = session.sync().await.unwrap();
        assert_eq!(second, SyncOutcome::Skipped(SkipReason::AlreadyFetching));

        provider.gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SyncOutcome::Refreshed(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.sync_state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let session = open(Arc::new(MockProvider::with_prices(&[])));
        let mut events = session.subscribe();

        session.add_purchase("dogecoin", 100.0, 0.1).unwrap();
        assert!(session.add_purchase("dogecoin", -1.0, 0.1).is_err());
        assert!(!session.remove("bitcoin").unwrap());
        assert!(session.remove("dogecoin").unwrap());

        let SessionEvent::ValuationChanged(after_add) = events.recv().await.unwrap() else {
            panic!("expected a valuation");
        };
        assert_eq!(after_add.holdings.len(), 1);
        let SessionEvent::ValuationChanged(after_remove) = events.recv().await.unwrap() else {
            panic!("expected a valuation");
        };
        assert!(after_remove.holdings.is_empty());
        assert_eq!(after_remove.total_change_percent, 0.0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_persistence_failure_still_notifies() {
        let session = PortfolioSession::open(
            Arc::new(ReadOnlyStore),
            Arc::new(MockProvider::with_prices(&[])),
        );
        let mut events = session.subscribe();

        let err = session.add_purchase("cardano", 100.0, 0.5).unwrap_err();
        assert!(matches!(err, PortfolioError::Persistence(ref msg) if msg.contains("quota exceeded")));
        assert_eq!(session.holdings().len(), 1);
        let SessionEvent::ValuationChanged(after_add) = events.recv().await.unwrap() else {
            panic!("expected a valuation");
        };
        assert_eq!(after_add.total_purchase_value, 50.0);

        let err = session.remove("cardano").unwrap_err();
        assert!(matches!(err, PortfolioError::Persistence(_)));
        assert!(session.is_empty());
        let SessionEvent::ValuationChanged(after_remove) = events.recv().await.unwrap() else {
            panic!("expected a valuation");
        };
        assert!(after_remove.holdings.is_empty());

        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_reopen_restores_ledger() {
        let store = Arc::new(MemoryBlobStore::new());
        let provider: Arc<dyn PriceProvider> = Arc::new(MockProvider::with_prices(&[]));

        let session = PortfolioSession::open(store.clone(), provider.clone());
        session.add_purchase("chainlink", 20.0, 14.5).unwrap();
        session.add_purchase("stellar", 300.0, 0.12).unwrap();
        let holdings = session.holdings();
        drop(session);

        let reopened = PortfolioSession::open(store, provider);
        assert_eq!(reopened.holdings(), holdings);
    }
}
