//! Profit/loss calculations over a ledger and a price cache.
//!
//! Everything here is pure and returns full precision; rounding is left to
//! [`crate::core::format`].

use super::holding::Holding;
use super::price::PriceCache;

/// Derived valuation of a single holding.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingValuation {
    pub asset_id: String,
    /// Price used for the valuation; the holding's average cost when no quote is cached.
    pub unit_price: f64,
    /// Whether `unit_price` came from the price cache.
    pub priced: bool,
    pub current_value: f64,
    pub purchase_value: f64,
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
}

/// Derived valuation of the whole portfolio, holdings in ledger order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioValuation {
    pub holdings: Vec<HoldingValuation>,
    pub total_value: f64,
    pub total_purchase_value: f64,
    pub total_profit_loss: f64,
    pub total_change_percent: f64,
}

fn percent_of(change: f64, base: f64) -> f64 {
    if base > 0.0 { (change / base) * 100.0 } else { 0.0 }
}

/// Values one holding. A missing quote counts as break-even.
pub fn value_holding(holding: &Holding, cache: &PriceCache) -> HoldingValuation {
    let quoted = cache.get(&holding.asset_id);
    let unit_price = quoted.unwrap_or(holding.avg_cost);
    let current_value = holding.amount * unit_price;
    let purchase_value = holding.purchase_value();
    let profit_loss = current_value - purchase_value;

    HoldingValuation {
        asset_id: holding.asset_id.clone(),
        unit_price,
        priced: quoted.is_some(),
        current_value,
        purchase_value,
        profit_loss,
        profit_loss_percent: percent_of(profit_loss, purchase_value),
    }
}

pub fn value_portfolio(holdings: &[Holding], cache: &PriceCache) -> PortfolioValuation {
    let holdings: Vec<HoldingValuation> =
        holdings.iter().map(|h| value_holding(h, cache)).collect();
    let total_value: f64 = holdings.iter().map(|v| v.current_value).sum();
    let total_purchase_value: f64 = holdings.iter().map(|v| v.purchase_value).sum();
    let total_profit_loss = total_value - total_purchase_value;

    PortfolioValuation {
        holdings,
        total_value,
        total_purchase_value,
        total_profit_loss,
        total_change_percent: percent_of(total_profit_loss, total_purchase_value),
    }
}
