//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Immutable point-in-time views of order book depth, served to market-data
// consumers and the wire protocol.
//
// | Component     | Description                                                   |
// |---------------|---------------------------------------------------------------|
// | DepthLevel    | One (price, aggregate quantity) pair                          |
// | MarketDepth   | Per-symbol snapshot: levels, top of book, spread, order count |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::orderbook::OrderBook;
use crate::types::{Quantity, Symbol};

/// Default number of levels per side in a depth snapshot.
pub const DEFAULT_DEPTH_LEVELS: usize = 5;

/// An aggregated price level in a depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthLevel {
    /// The price for this level.
    pub price: Decimal,
    /// Total remaining quantity of all orders at this price.
    pub quantity: Quantity,
}

/// A snapshot of one symbol's order book depth.
///
/// Bids are ordered best (highest) price first, asks best (lowest) price
/// first. The snapshot is detached from the book: it never changes after
/// capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketDepth {
    pub symbol: Symbol,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub spread: Option<Decimal>,
    /// Total resting orders across all levels, both sides.
    pub total_orders: usize,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl MarketDepth {
    /// Captures a snapshot of `book` with up to `levels` levels per side.
    pub fn capture(book: &OrderBook, levels: usize) -> Self {
        let to_levels = |pairs: Vec<(Decimal, Quantity)>| {
            pairs
                .into_iter()
                .map(|(price, quantity)| DepthLevel { price, quantity })
                .collect()
        };
        Self {
            symbol: book.symbol().to_string(),
            bids: to_levels(book.bid_levels(levels)),
            asks: to_levels(book.ask_levels(levels)),
            best_bid: book.best_bid(),
            best_ask: book.best_ask(),
            spread: book.spread(),
            total_orders: book.order_count(),
            timestamp: Utc::now(),
        }
    }
}
