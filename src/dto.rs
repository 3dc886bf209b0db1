// src/dto.rs
//
// Wire formats for the REST API and the subscribe/publish WebSocket channel.
// Push payloads are decoded once at the channel boundary into tagged unions;
// the reconcilers then match on them exhaustively.
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of POST /v1/orders. The signature is computed over the other fields
/// and attached before the request is sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub client_order_id: String,
    pub market_id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    pub amount: OrderAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub nonce: String,
    pub verifying_chain_id: u64,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAmount {
    #[serde(rename = "type")]
    pub kind: String,
    /// Integer token units, scaled by the base asset's decimals
    pub value: String,
}

impl OrderAmount {
    pub fn fixed(value: String) -> Self {
        Self {
            kind: "fixed".to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub request_status: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Body of DELETE /v1/orders/{exchangeOrderId}.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    pub market_id: String,
    pub order_id: String,
    pub side: String,
    /// Integer token units, scaled by the base asset's decimals
    pub amount: String,
    pub nonce: String,
    pub verifying_chain_id: u64,
    pub signature: String,
}

/// Structured error body returned by the exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

/// Order payload shared by GET /v1/orders/external:{clientOrderId} and the
/// MyOrders push channel. The REST detail additionally carries executions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrder {
    /// Exchange-assigned order id
    pub id: String,
    pub status: String,
    pub timing: OrderTiming,
    #[serde(default)]
    pub executions: Vec<WireExecution>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTiming {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl OrderTiming {
    /// First non-null of closedAt, updatedAt, createdAt.
    pub fn effective(&self) -> Option<DateTime<Utc>> {
        self.closed_at.or(self.updated_at).or(self.created_at)
    }
}

/// An execution, from either the REST order detail (tradeId/role) or the
/// MyTrades push channel (id/executionRole).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireExecution {
    #[serde(rename = "tradeId", alias = "id")]
    pub trade_id: String,
    /// Exchange order id; present on push trades only
    #[serde(default)]
    pub order_id: Option<String>,
    /// Raw integer token units at base-asset decimals
    pub amount: String,
    /// Human-readable price, not scaled
    pub price: Decimal,
    /// Raw integer token units at the fee asset's decimals
    pub fee_amount: String,
    pub fee_symbol: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "role", alias = "executionRole")]
    pub role: ExecutionRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ExecutionRole {
    Maker,
    Taker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalancesResponse {
    pub balances: Vec<WireBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBalance {
    pub symbol: String,
    /// Raw integer token units
    pub total: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsResponse {
    pub limits: Vec<LimitEntry>,
}

/// Per-market tradeable ceilings; the exchange has transmitted these both as
/// objects and as [marketId, base, quote] triples.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LimitEntry {
    Object {
        #[serde(rename = "marketId")]
        market_id: String,
        base: String,
        quote: String,
    },
    Triple(String, String, String),
}

impl LimitEntry {
    pub fn market_id(&self) -> &str {
        match self {
            LimitEntry::Object { market_id, .. } => market_id,
            LimitEntry::Triple(market_id, _, _) => market_id,
        }
    }

    pub fn base(&self) -> &str {
        match self {
            LimitEntry::Object { base, .. } => base,
            LimitEntry::Triple(_, base, _) => base,
        }
    }

    pub fn quote(&self) -> &str {
        match self {
            LimitEntry::Object { quote, .. } => quote,
            LimitEntry::Triple(_, _, quote) => quote,
        }
    }
}

/// Order book as served by GET /v1/order-book/{marketId} and the OrderBook
/// push channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrderBook {
    #[serde(default)]
    pub market_id: Option<String>,
    pub buy: Vec<WireLevel>,
    pub sell: Vec<WireLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// A public trade as published on MarketTrades:
/// [tradeId, side, amount, price, timestamp].
#[derive(Debug, Clone, Deserialize)]
pub struct WireMarketTrade(pub i64, pub String, pub Decimal, pub Decimal, pub f64);

/// Subscription topics offered by the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Topic {
    OrderBook {
        #[serde(rename = "marketId")]
        market_id: String,
    },
    MarketTrades {
        #[serde(rename = "marketId")]
        market_id: String,
    },
    Balances,
    Limits,
    MyOrders,
    MyTrades,
}

/// Client-to-exchange envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
}

/// Exchange-to-client envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PushMessage {
    Publish { topic: Topic, data: PushEvent },
}

/// Event payloads carried by Publish envelopes. Event kinds this connector
/// does not consume decode into `Unknown` rather than failing the stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    MyOrderCreated {
        order: WireOrder,
    },
    MyOrderUpdated {
        order: WireOrder,
    },
    /// Bulk snapshot sent when the subscription is established
    MyOrders {
        orders: Vec<WireOrder>,
    },
    MyTradesCreated {
        trades: Vec<WireExecution>,
    },
    /// Bulk snapshot sent when the subscription is established
    MyTrades {
        trades: Vec<WireExecution>,
    },
    Balances {
        balances: Vec<WireBalance>,
    },
    Limits {
        limits: Vec<LimitEntry>,
    },
    OrderBook(WireOrderBook),
    MarketTrades {
        #[serde(rename = "marketId")]
        market_id: String,
        trades: Vec<WireMarketTrade>,
    },
    #[serde(other)]
    Unknown,
}
