//! Static catalog of supported assets

/// A tradeable asset known to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    /// Identifier used by the price service, e.g. "bitcoin".
    pub id: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

const ASSETS: &[AssetInfo] = &[
    AssetInfo { id: "bitcoin", name: "Bitcoin", symbol: "BTC" },
    AssetInfo { id: "ethereum", name: "Ethereum", symbol: "ETH" },
    AssetInfo { id: "cardano", name: "Cardano", symbol: "ADA" },
    AssetInfo { id: "polkadot", name: "Polkadot", symbol: "DOT" },
    AssetInfo { id: "chainlink", name: "Chainlink", symbol: "LINK" },
    AssetInfo { id: "litecoin", name: "Litecoin", symbol: "LTC" },
    AssetInfo { id: "stellar", name: "Stellar", symbol: "XLM" },
    AssetInfo { id: "dogecoin", name: "Dogecoin", symbol: "DOGE" },
];

/// All supported assets, in catalog order.
pub fn all() -> &'static [AssetInfo] {
    ASSETS
}

/// Looks up an asset by its identifier. Identifiers are case sensitive.
pub fn lookup(id: &str) -> Option<&'static AssetInfo> {
    ASSETS.iter().find(|asset| asset.id == id)
}
