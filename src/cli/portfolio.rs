use super::{market, ui};
use crate::core::format::{format_amount, format_price, format_signed_percent};
use crate::core::refresh::RefreshTask;
use crate::core::{
    PortfolioError, PortfolioSession, PortfolioValuation, PriceProvider, SessionEvent, SyncOutcome,
    catalog,
};
use anyhow::Result;
use comfy_table::Cell;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Renders holdings and totals. Holdings without a quote are shown at cost.
pub fn render(session: &PortfolioSession, valuation: &PortfolioValuation) -> String {
    let holdings = session.holdings();
    if holdings.is_empty() {
        return format!(
            "{}\n{}",
            ui::style_text("Your portfolio is empty.", ui::StyleType::TotalLabel),
            ui::style_text(
                "Add a holding with: coinfolio add <asset> <amount> <price>",
                ui::StyleType::Subtle
            )
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Holdings"),
        ui::header_cell("Price"),
        ui::header_cell("24h"),
        ui::header_cell("Avg Cost"),
        ui::header_cell("Value"),
        ui::header_cell("Profit/Loss"),
    ]);

    for holding in &holdings {
        let Some(value) = valuation
            .holdings
            .iter()
            .find(|v| v.asset_id == holding.asset_id)
        else {
            continue;
        };
        let quote = session.quote(&holding.asset_id);

        let price = if value.priced {
            ui::right_cell(format!("${}", format_price(value.unit_price)))
        } else {
            ui::na_cell()
        };
        let change = match quote.and_then(|q| q.change_24h) {
            Some(change) => ui::change_cell(change),
            None => ui::na_cell(),
        };

        table.add_row(vec![
            Cell::new(format!("{} ({})", holding.display_name, holding.symbol)),
            ui::right_cell(format!("{} {}", format_amount(holding.amount), holding.symbol)),
            price,
            change,
            ui::right_cell(format!("${}", format_price(holding.avg_cost))),
            ui::right_cell(format!("${}", format_price(value.current_value))),
            ui::profit_loss_cell(value.profit_loss, value.profit_loss_percent),
        ]);
    }

    let total_style = if valuation.total_change_percent >= 0.0 {
        ui::StyleType::TotalValue
    } else {
        ui::StyleType::Error
    };

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Portfolio", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{} {} {}",
        ui::style_text("Total Value:", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("${}", format_price(valuation.total_value)),
            ui::StyleType::TotalValue
        ),
        ui::style_text(
            &format_signed_percent(valuation.total_change_percent),
            total_style
        ),
    ));
    if let Some(updated_at) = session.prices_updated_at() {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("Prices as of {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
                ui::StyleType::Subtle
            )
        ));
    }

    output
}

/// Lists the assets that can be added to the portfolio.
pub fn list_assets() -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
    ]);
    for asset in catalog::all() {
        table.add_row(vec![asset.id, asset.name, asset.symbol]);
    }
    table.to_string()
}

/// Fetches prices once with a spinner. A failure is printed and the
/// portfolio is still shown with its previous prices.
async fn sync_and_render(session: &PortfolioSession) {
    let pb = ui::new_spinner("Fetching current prices...");
    let result = session.sync().await;
    pb.finish_and_clear();

    let valuation = match result {
        Ok(SyncOutcome::Refreshed(valuation)) => valuation,
        Ok(SyncOutcome::Skipped(reason)) => {
            debug!(?reason, "Price sync skipped");
            session.valuation()
        }
        Err(failure) => {
            eprintln!("{}", ui::style_text(&failure.to_string(), ui::StyleType::Error));
            session.valuation()
        }
    };
    println!("{}", render(session, &valuation));
}

pub async fn add(
    session: &PortfolioSession,
    asset_id: &str,
    amount: f64,
    price: f64,
    offline: bool,
) -> Result<()> {
    let holding = match session.add_purchase(asset_id, amount, price) {
        Ok(holding) => holding,
        Err(PortfolioError::Validation(e)) => {
            return Err(anyhow::anyhow!(e).context("Could not add purchase"));
        }
        Err(e @ PortfolioError::Persistence(_)) => {
            warn!("Purchase kept for this session only");
            return Err(e.into());
        }
    };

    println!(
        "{}",
        ui::style_text(
            &format!(
                "Added {} {} to portfolio. Position: {} {} at ${} average cost.",
                format_amount(amount),
                holding.symbol,
                format_amount(holding.amount),
                holding.symbol,
                format_price(holding.avg_cost)
            ),
            ui::StyleType::Success
        )
    );

    if offline {
        println!("{}", render(session, &session.valuation()));
    } else {
        sync_and_render(session).await;
    }
    Ok(())
}

pub async fn remove(session: &PortfolioSession, asset_id: &str, offline: bool) -> Result<()> {
    if session.remove(asset_id)? {
        println!(
            "{}",
            ui::style_text(
                &format!("Removed {asset_id} from portfolio."),
                ui::StyleType::Success
            )
        );
    } else {
        println!(
            "{}",
            ui::style_text(
                &format!("{asset_id} is not in the portfolio."),
                ui::StyleType::Subtle
            )
        );
    }

    if offline {
        println!("{}", render(session, &session.valuation()));
    } else {
        sync_and_render(session).await;
    }
    Ok(())
}

pub async fn summary(session: &PortfolioSession) -> Result<()> {
    sync_and_render(session).await;
    Ok(())
}

async fn print_market(provider: &dyn PriceProvider, market_assets: &[String]) {
    if market_assets.is_empty() {
        return;
    }
    match market::render(provider, market_assets).await {
        Ok(ticker) => println!("\n{ticker}"),
        Err(e) => {
            warn!("Market refresh failed: {e:#}");
            eprintln!("{}", ui::style_text(&format!("{e:#}"), ui::StyleType::Error));
        }
    }
}

/// Shows the portfolio and the market ticker, refreshing both until Ctrl-C.
pub async fn watch(
    session: Arc<PortfolioSession>,
    provider: Arc<dyn PriceProvider>,
    market_assets: &[String],
    period: Duration,
) -> Result<()> {
    let mut events = session.subscribe();
    sync_and_render(&session).await;
    print_market(provider.as_ref(), market_assets).await;
    // The initial render already covers the first refresh.
    while let Ok(event) = events.try_recv() {
        debug!(?event, "Skipping event from initial sync");
    }

    let handle = RefreshTask::spawn(Arc::clone(&session), period);
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Refreshing every {}s. Press Ctrl-C to stop.",
                period.as_secs()
            ),
            ui::StyleType::Subtle
        )
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::ValuationChanged(valuation)) => {
                    ui::print_separator();
                    println!("{}", render(&session, &valuation));
                    print_market(provider.as_ref(), market_assets).await;
                }
                Ok(SessionEvent::SyncFailed(failure)) => {
                    eprintln!("{}", ui::style_text(&failure.to_string(), ui::StyleType::Error));
                    print_market(provider.as_ref(), market_assets).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Session events lagged");
                }
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {e}");
                }
                break;
            }
        }
    }

    handle.stop().await;
    Ok(())
}
