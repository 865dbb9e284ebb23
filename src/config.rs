use dotenv::dotenv;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::types::Quantity;

const LISTEN_ADDR: &str = "LISTEN_ADDR";
const SYMBOLS: &str = "SYMBOLS";
const MAX_ORDER_PRICE: &str = "MAX_ORDER_PRICE";
const MAX_ORDER_QUANTITY: &str = "MAX_ORDER_QUANTITY";
const MAX_ORDERS_PER_SYMBOL: &str = "MAX_ORDERS_PER_SYMBOL";
const MAX_SYMBOLS: &str = "MAX_SYMBOLS";
const STRICT_VALIDATION: &str = "STRICT_VALIDATION";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9100";

/// Behavioural limits and switches for the matching engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on limit order prices.
    pub max_order_price: Decimal,
    /// Upper bound on order quantities.
    pub max_order_quantity: Quantity,
    /// Per-symbol cap on resting orders (strict validation only).
    pub max_orders_per_symbol: usize,
    /// Cap on registered symbols (strict validation only).
    pub max_symbols: usize,
    /// Enables the risk checks beyond basic field validation.
    pub strict_validation: bool,
    /// Advisory; the core is agnostic to how callers schedule it.
    pub enable_threading: bool,
    /// Advisory; log filtering is the subscriber's concern.
    pub enable_logging: bool,
    /// Advisory; transports may apply this as a deadline, the core does not.
    pub order_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_order_price: dec!(1_000_000),
            max_order_quantity: 1_000_000,
            max_orders_per_symbol: 10_000,
            max_symbols: 1_000,
            strict_validation: true,
            enable_threading: true,
            enable_logging: true,
            order_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Process-level configuration for the server binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the TCP front end binds to.
    pub listen_addr: SocketAddr,
    /// Symbols registered at startup.
    pub symbols: Vec<String>,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<AppConfig, String> {
        // Load .env file if present
        dotenv().ok();

        let listen_addr = env::var(LISTEN_ADDR)
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|_| format!("failed to parse environment variable {}", LISTEN_ADDR))?;

        let symbols = match env::var(SYMBOLS) {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => vec!["AAPL".to_string(), "GOOGL".to_string(), "TSLA".to_string()],
        };

        let mut engine = EngineConfig::default();
        if let Some(value) = read_env::<Decimal>(MAX_ORDER_PRICE)? {
            engine.max_order_price = value;
        }
        if let Some(value) = read_env::<Quantity>(MAX_ORDER_QUANTITY)? {
            engine.max_order_quantity = value;
        }
        if let Some(value) = read_env::<usize>(MAX_ORDERS_PER_SYMBOL)? {
            engine.max_orders_per_symbol = value;
        }
        if let Some(value) = read_env::<usize>(MAX_SYMBOLS)? {
            engine.max_symbols = value;
        }
        if let Some(value) = read_env::<bool>(STRICT_VALIDATION)? {
            engine.strict_validation = value;
        }

        Ok(AppConfig {
            listen_addr,
            symbols,
            engine,
        })
    }
}

/// Reads an optional environment variable, failing only when it is present
/// but unparseable.
fn read_env<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("failed to parse environment variable {}: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}
