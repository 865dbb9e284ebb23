// Expose the modules
pub mod types;
pub mod orderbook;
pub mod matching_engine;
pub mod depth;
pub mod events;
pub mod config;
pub mod protocol;
pub mod server;

// Re-export key types for easier usage
pub use config::{AppConfig, EngineConfig};
pub use depth::{DepthLevel, MarketDepth, DEFAULT_DEPTH_LEVELS};
pub use events::{ChannelOrderSink, ChannelTradeSink, LogSink, OrderSink, TradeSink};
pub use matching_engine::{EngineStatistics, MatchingEngine};
pub use orderbook::{OrderBook, PriceLevel};
pub use protocol::{ProtocolError, Request, Response};
pub use server::Server;
pub use types::{
    EngineError, EngineResult, Order, OrderId, OrderSide, OrderType, Quantity, Symbol, Trade,
    TradeId,
};
