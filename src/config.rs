// src/config.rs
use crate::domain::errors::{ConnectorError, ConnectorResult};
use dotenv::dotenv;
use std::env;
use std::fmt;

// API endpoints
pub const CONFIG_PATH: &str = "/v1/config";
pub const BALANCES_PATH: &str = "/v1/balances";
pub const LIMITS_PATH: &str = "/v1/limits";
pub const ORDERS_PATH: &str = "/v1/orders";
pub const ORDER_BOOK_PATH: &str = "/v1/order-book";

// Structured error reasons returned by the exchange
pub const ERROR_REASON_REJECTED_BY_SEQUENCER: &str = "RejectedBySequencer";
pub const ERROR_REASON_ORDER_NOT_FOUND: &str = "OrderNotFound";

// Placement acknowledgements carrying this request status are hard rejections
pub const REQUEST_STATUS_REJECTED: &str = "Rejected";

/// Sentinel token address for a chain's native asset.
pub const ADDRESS_ZERO: &str = "0x0000000000000000000000000000000000000000";

/// Exchange deployment the connector talks to. Each deployment has its own
/// REST/WebSocket endpoints and default chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeDomain {
    #[default]
    Localhost,
    Demo,
}

impl ExchangeDomain {
    pub fn from_name(name: &str) -> Option<ExchangeDomain> {
        match name {
            "localhost" => Some(ExchangeDomain::Localhost),
            "demo" => Some(ExchangeDomain::Demo),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExchangeDomain::Localhost => "localhost",
            ExchangeDomain::Demo => "demo",
        }
    }

    pub fn rest_url(&self) -> &'static str {
        match self {
            ExchangeDomain::Localhost => "http://localhost:9000",
            ExchangeDomain::Demo => "https://demo-api.chainring.co",
        }
    }

    pub fn wss_url(&self) -> &'static str {
        match self {
            ExchangeDomain::Localhost => "ws://localhost:9000/connect",
            ExchangeDomain::Demo => "wss://demo-api.chainring.co/connect",
        }
    }

    /// Chain id used for login signatures and as the verifying chain id on
    /// outgoing order requests.
    pub fn default_chain_id(&self) -> u64 {
        match self {
            ExchangeDomain::Localhost => 1337,
            ExchangeDomain::Demo => 31338,
        }
    }

    /// Full REST URL for a given endpoint path.
    pub fn rest_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.rest_url(), path)
    }

    /// WebSocket connection URL; the channel is authenticated at connect
    /// time by passing the login token as a query parameter.
    pub fn ws_connect_url(&self, auth_token: &str) -> String {
        format!("{}?auth={}", self.wss_url(), auth_token)
    }
}

impl fmt::Display for ExchangeDomain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Connector configuration
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Exchange deployment to connect to
    pub domain: ExchangeDomain,

    /// Wallet private key (hex); only ever used to produce signatures
    pub secret_key: String,

    /// Log level (e.g., "info", "debug", "warn", "error")
    pub log_level: String,
}

impl ConnectorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ConnectorResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let domain_name = env::var("CHAINRING_DOMAIN").unwrap_or_else(|_| "localhost".to_string());
        let domain = ExchangeDomain::from_name(&domain_name).ok_or_else(|| {
            ConnectorError::Config(format!("Unknown CHAINRING_DOMAIN value: {}", domain_name))
        })?;

        let secret_key = env::var("CHAINRING_SECRET_KEY").map_err(|_| {
            ConnectorError::Config("Missing CHAINRING_SECRET_KEY environment variable".to_string())
        })?;

        Ok(ConnectorConfig {
            domain,
            secret_key,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) {
        let log_level = match self.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        env_logger::Builder::new().filter_level(log_level).try_init().ok();
    }
}
