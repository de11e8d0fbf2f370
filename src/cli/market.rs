use super::ui;
use crate::core::format::format_price;
use crate::core::{PriceProvider, catalog};
use anyhow::{Context, Result};
use comfy_table::Cell;

/// One-shot ticker with the current price and 24h change of `asset_ids`.
pub async fn run(provider: &dyn PriceProvider, asset_ids: &[String]) -> Result<()> {
    if asset_ids.is_empty() {
        println!("No market assets configured.");
        return Ok(());
    }

    let pb = ui::new_spinner("Loading market data...");
    let result = render(provider, asset_ids).await;
    pb.finish_and_clear();
    println!("{}", result?);
    Ok(())
}

/// Fetches quotes for `asset_ids` and renders them as a titled table.
pub async fn render(provider: &dyn PriceProvider, asset_ids: &[String]) -> Result<String> {
    let quotes = provider
        .fetch_quotes(asset_ids)
        .await
        .context("Failed to load market data")?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Price"),
        ui::header_cell("24h"),
    ]);

    for id in asset_ids {
        let name = catalog::lookup(id).map_or(id.as_str(), |asset| asset.name);
        let (price, change) = match quotes.get(id) {
            Some(quote) => (
                ui::right_cell(format!("${}", format_price(quote.unit_price))),
                ui::change_cell(quote.change_24h.unwrap_or(0.0)),
            ),
            None => (ui::na_cell(), ui::na_cell()),
        };
        table.add_row(vec![Cell::new(name), price, change]);
    }

    Ok(format!(
        "{}\n\n{}",
        ui::style_text("Market", ui::StyleType::Title),
        table
    ))
}
