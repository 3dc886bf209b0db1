// src/domain/mod.rs
pub mod errors;
pub mod models;

// Re-export common types for convenience
pub use errors::{
    ConnectorError, ConnectorResult, MetadataError, MetadataResult, PrecisionError,
    PrecisionResult, ReconcileError, ReconcileResult, SigningError, SigningResult,
};
pub use models::{
    BalanceEntry, FeeKind, Fill, MarketTrade, OrderBookSnapshot, OrderSide, OrderState,
    OrderType, PriceLevel, TradeFee, TrackedOrder,
};
