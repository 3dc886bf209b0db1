// src/book.rs
//
// Converts wire order-book and market-trade payloads into domain records.
// The exchange only publishes full snapshots; there is no diff channel.
use crate::domain::models::{MarketTrade, OrderBookSnapshot, OrderSide, PriceLevel};
use crate::dto::{WireMarketTrade, WireOrderBook};
use chrono::{DateTime, Utc};

impl OrderBookSnapshot {
    pub fn from_wire(market_id: &str, wire: &WireOrderBook, timestamp: DateTime<Utc>) -> Self {
        Self {
            market_id: market_id.to_string(),
            bids: wire.buy.iter().map(level).collect(),
            asks: wire.sell.iter().map(level).collect(),
            timestamp,
        }
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }
}

fn level(wire: &crate::dto::WireLevel) -> PriceLevel {
    PriceLevel {
        price: wire.price,
        size: wire.size,
    }
}

impl MarketTrade {
    pub fn from_wire(market_id: &str, trade: &WireMarketTrade) -> Self {
        let WireMarketTrade(trade_id, side, amount, price, timestamp) = trade;
        Self {
            market_id: market_id.to_string(),
            trade_id: *trade_id,
            side: if side == OrderSide::Sell.as_str() {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            },
            amount: *amount,
            price: *price,
            timestamp: *timestamp,
        }
    }
}
