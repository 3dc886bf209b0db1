// src/domain/models.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Order side, using the exchange's capitalized wire literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }

    pub fn from_wire(side: &str) -> Option<OrderSide> {
        match side {
            "Buy" => Some(OrderSide::Buy),
            "Sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order type; the exchange expects lowercase literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self, OrderType::Limit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical order lifecycle states. Terminal states are immutable: once an
/// order is Filled, Cancelled, Rejected or Failed no further transition is
/// accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    PendingCreate,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Failed,
}

impl OrderState {
    /// Maps an exchange status string to the canonical state. Expired and
    /// Rejected orders are reported as Cancelled, matching the exchange's
    /// own semantics for resting orders that never fill.
    pub fn from_wire(status: &str) -> Option<OrderState> {
        match status {
            "Open" => Some(OrderState::Open),
            "Partial" => Some(OrderState::PartiallyFilled),
            "Filled" => Some(OrderState::Filled),
            "Cancelled" | "Expired" | "Rejected" => Some(OrderState::Cancelled),
            "Failed" => Some(OrderState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected | OrderState::Failed
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            OrderState::PendingCreate => "PendingCreate",
            OrderState::Open => "Open",
            OrderState::PartiallyFilled => "PartiallyFilled",
            OrderState::Filled => "Filled",
            OrderState::Cancelled => "Cancelled",
            OrderState::Rejected => "Rejected",
            OrderState::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// How a trade fee affects the account: buys pay the fee on top of the cost,
/// sells have it deducted from the proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeKind {
    AddedToCost,
    DeductedFromReturns,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeFee {
    pub asset: String,
    pub amount: Decimal,
    pub kind: FeeKind,
}

/// A single execution applied to an order. Trade ids are unique per order;
/// the reconciler drops duplicate deliveries.
#[derive(Debug, Clone)]
pub struct Fill {
    pub trade_id: String,
    pub is_taker: bool,
    pub amount: Decimal,
    pub quote_amount: Decimal,
    pub price: Decimal,
    pub fee: TradeFee,
    pub timestamp: DateTime<Utc>,
}

/// A locally tracked order. The client order id is generated locally and is
/// unique for the lifetime of the tracker; the exchange order id is assigned
/// at most once, when the exchange accepts the placement.
#[derive(Debug, Clone)]
pub struct TrackedOrder {
    pub client_order_id: String,
    pub exchange_order_id: Option<String>,
    pub market_id: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub nonce: String,
    pub state: OrderState,
    pub updated_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub fills: Vec<Fill>,
}

impl TrackedOrder {
    pub fn new(
        client_order_id: &str,
        market_id: &str,
        side: OrderSide,
        order_type: OrderType,
        amount: Decimal,
        price: Option<Decimal>,
        nonce: &str,
    ) -> Self {
        Self {
            client_order_id: client_order_id.to_string(),
            exchange_order_id: None,
            market_id: market_id.to_string(),
            side,
            order_type,
            amount,
            price,
            nonce: nonce.to_string(),
            state: OrderState::PendingCreate,
            updated_at: None,
            failure_reason: None,
            fills: Vec::new(),
        }
    }

    /// Base amount filled so far.
    pub fn executed_amount(&self) -> Decimal {
        self.fills.iter().map(|f| f.amount).sum()
    }

    pub fn has_fill(&self, trade_id: &str) -> bool {
        self.fills.iter().any(|f| f.trade_id == trade_id)
    }
}

/// Per-asset balance view produced by the balance reconciler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceEntry {
    pub total: Decimal,
    pub available: Decimal,
}

/// One side of the order book at a single price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Full order book snapshot; the exchange does not publish diffs.
#[derive(Debug, Clone)]
pub struct OrderBookSnapshot {
    pub market_id: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}

/// A public trade from the market-trades channel.
#[derive(Debug, Clone)]
pub struct MarketTrade {
    pub market_id: String,
    pub trade_id: i64,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub timestamp: f64,
}
