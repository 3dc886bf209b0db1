// src/lib.rs
pub mod book;
pub mod config;
pub mod domain;
pub mod dto;
pub mod metadata;
pub mod nonce;
pub mod precision;
pub mod reconcile;
pub mod signing;

pub use config::{ConnectorConfig, ExchangeDomain};
pub use metadata::{ExchangeMetadata, MetadataHandle};
pub use reconcile::{BalanceReconciler, OrderLifecycleReconciler};
pub use signing::{SigningEngine, Wallet};
