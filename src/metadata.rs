// src/metadata.rs
//
// Exchange configuration snapshot served by GET /v1/config: the chains the
// exchange settles on, the markets it quotes, and the current fee schedule.
// The snapshot is the single source of truth for token decimals and contract
// addresses; it is shared read-only and replaced atomically on refresh.
use crate::domain::errors::{MetadataError, MetadataResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::{Arc, RwLock};

/// Name of the settlement contract entry in a chain's contract list.
const EXCHANGE_CONTRACT_NAME: &str = "Exchange";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeMetadata {
    pub chains: Vec<Chain>,
    pub markets: Vec<Market>,
    pub fee_rates: FeeRates,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub contracts: Vec<Contract>,
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    /// Fully qualified symbol name, "SYMBOL:chainId"
    pub name: String,
    /// On-chain decimal exponent of the token
    pub decimals: u32,
    /// Token contract address; null for the chain's native asset
    #[serde(default)]
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// "baseSymbol/quoteSymbol"
    pub id: String,
    pub base_symbol: String,
    pub base_decimals: u32,
    pub quote_symbol: String,
    pub quote_decimals: u32,
    pub tick_size: Decimal,
    #[serde(default)]
    pub last_price: Option<Decimal>,
    #[serde(default)]
    pub min_allowed_bid_price: Option<Decimal>,
    #[serde(default)]
    pub max_allowed_offer_price: Option<Decimal>,
    #[serde(default)]
    pub min_fee: Option<Decimal>,
}

/// Maker/taker fee rates in parts-per-million.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRates {
    pub maker: u32,
    pub taker: u32,
}

/// Per-market trading rule derived from exchange metadata.
#[derive(Debug, Clone)]
pub struct TradingRule {
    pub market_id: String,
    pub min_price_increment: Decimal,
    pub min_base_amount_increment: Decimal,
    pub min_quote_amount_increment: Decimal,
}

/// Extracts the chain id embedded in a fully qualified symbol ("BTC:1337").
pub fn chain_id_of_symbol(symbol: &str) -> MetadataResult<u64> {
    symbol
        .split_once(':')
        .and_then(|(_, id)| id.parse().ok())
        .ok_or_else(|| MetadataError::MalformedSymbol(symbol.to_string()))
}

/// Splits a market id ("BASE/QUOTE") into its symbols.
pub fn split_market_id(market_id: &str) -> MetadataResult<(&str, &str)> {
    market_id
        .split_once('/')
        .filter(|(base, quote)| !base.is_empty() && !quote.is_empty())
        .ok_or_else(|| MetadataError::MalformedMarketId(market_id.to_string()))
}

impl ExchangeMetadata {
    /// A usable snapshot carries at least one chain and one market.
    pub fn is_valid(&self) -> bool {
        !self.chains.is_empty() && !self.markets.is_empty()
    }

    fn chain(&self, chain_id: u64) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == chain_id)
    }

    fn symbol_info(&self, chain_id: u64, symbol: &str) -> Option<&SymbolInfo> {
        self.chain(chain_id)?.symbols.iter().find(|s| s.name == symbol)
    }

    /// On-chain decimal exponent of a fully qualified symbol.
    pub fn symbol_decimals(&self, symbol: &str) -> MetadataResult<u32> {
        let chain_id = chain_id_of_symbol(symbol)?;
        self.symbol_info(chain_id, symbol)
            .map(|s| s.decimals)
            .ok_or_else(|| MetadataError::SymbolNotFound(symbol.to_string()))
    }

    /// Token contract address for a symbol; `None` for the chain's native
    /// asset.
    pub fn token_address(&self, chain_id: u64, symbol: &str) -> MetadataResult<Option<&str>> {
        self.symbol_info(chain_id, symbol)
            .map(|s| s.contract_address.as_deref())
            .ok_or_else(|| MetadataError::TokenAddressNotFound {
                symbol: symbol.to_string(),
                chain_id,
            })
    }

    /// Settlement contract address for a chain.
    pub fn exchange_contract_address(&self, chain_id: u64) -> MetadataResult<&str> {
        self.chain(chain_id)
            .and_then(|c| {
                c.contracts
                    .iter()
                    .find(|contract| contract.name == EXCHANGE_CONTRACT_NAME)
            })
            .map(|contract| contract.address.as_str())
            .ok_or(MetadataError::ExchangeContractNotFound(chain_id))
    }

    pub fn market(&self, market_id: &str) -> MetadataResult<&Market> {
        self.markets
            .iter()
            .find(|m| m.id == market_id)
            .ok_or_else(|| MetadataError::MarketNotFound(market_id.to_string()))
    }

    /// Maker fee as a decimal fraction (rates are quoted in parts-per-million).
    pub fn maker_fee_fraction(&self) -> Decimal {
        Decimal::new(self.fee_rates.maker as i64, 6)
    }

    /// Taker fee as a decimal fraction.
    pub fn taker_fee_fraction(&self) -> Decimal {
        Decimal::new(self.fee_rates.taker as i64, 6)
    }

    /// Derives trading rules for every quoted market.
    pub fn trading_rules(&self) -> Vec<TradingRule> {
        self.markets
            .iter()
            .map(|market| TradingRule {
                market_id: market.id.clone(),
                min_price_increment: market.tick_size,
                // rust_decimal caps the scale at 28 fractional digits
                min_base_amount_increment: Decimal::new(1, market.base_decimals.min(28)),
                min_quote_amount_increment: Decimal::new(1, market.quote_decimals.min(28)),
            })
            .collect()
    }
}

/// Shared handle to the current metadata snapshot. A refresh is published as
/// a single atomic replace; readers always observe a fully formed snapshot,
/// never a partially updated one.
#[derive(Debug, Clone)]
pub struct MetadataHandle {
    inner: Arc<RwLock<Arc<ExchangeMetadata>>>,
}

impl MetadataHandle {
    pub fn new(metadata: ExchangeMetadata) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(metadata))),
        }
    }

    /// Replaces the current snapshot.
    pub fn publish(&self, metadata: ExchangeMetadata) {
        let mut guard = self.inner.write().expect("metadata lock poisoned");
        *guard = Arc::new(metadata);
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<ExchangeMetadata> {
        self.inner.read().expect("metadata lock poisoned").clone()
    }
}
