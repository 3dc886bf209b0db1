// src/domain/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Precision error: {0}")]
    Precision(#[from] PrecisionError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failed lookups against the exchange configuration snapshot.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Symbol {0} not found in the exchange configuration")]
    SymbolNotFound(String),

    #[error("Contract address for symbol {symbol} on chain {chain_id} not found in the exchange configuration")]
    TokenAddressNotFound { symbol: String, chain_id: u64 },

    #[error("Exchange contract address not found for chain {0}")]
    ExchangeContractNotFound(u64),

    #[error("Market {0} not found in the exchange configuration")]
    MarketNotFound(String),

    #[error("Malformed symbol {0}: expected SYMBOL:chainId")]
    MalformedSymbol(String),

    #[error("Malformed market id {0}: expected BASE/QUOTE")]
    MalformedMarketId(String),

    #[error("Invalid contract address {0}")]
    InvalidAddress(String),
}

#[derive(Error, Debug)]
pub enum PrecisionError {
    #[error("Value {0} does not fit in token units at {1} decimals")]
    OutOfRange(String, u32),

    #[error("Invalid raw token amount {0}")]
    InvalidRawAmount(String),
}

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Symbol resolution failed: {0}")]
    SymbolResolution(#[from] MetadataError),

    #[error("Malformed nonce {0}: expected a hex string")]
    MalformedNonce(String),

    #[error("Invalid order amount {0}")]
    InvalidAmount(String),

    #[error("Invalid order side {0}")]
    InvalidSide(String),

    #[error("Invalid order price {0}")]
    InvalidPrice(String),

    #[error("Invalid wallet private key")]
    InvalidPrivateKey,

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Precision error: {0}")]
    Precision(#[from] PrecisionError),

    #[error("Message encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Duplicate client order id {0}")]
    DuplicateClientOrderId(String),

    #[error("Exchange order id {exchange_order_id} already mapped to client order {client_order_id}")]
    DuplicateExchangeOrderId {
        exchange_order_id: String,
        client_order_id: String,
    },

    #[error("No tracked order with client order id {0}")]
    UnknownOrder(String),

    #[error("Unknown order status {0}")]
    UnknownStatus(String),

    #[error("Invalid decimal value {0}")]
    InvalidDecimal(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Precision error: {0}")]
    Precision(#[from] PrecisionError),
}

// Result type aliases for convenience
pub type ConnectorResult<T> = Result<T, ConnectorError>;
pub type MetadataResult<T> = Result<T, MetadataError>;
pub type PrecisionResult<T> = Result<T, PrecisionError>;
pub type SigningResult<T> = Result<T, SigningError>;
pub type ReconcileResult<T> = Result<T, ReconcileError>;
