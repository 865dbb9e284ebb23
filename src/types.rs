//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the matching engine:
// identifier aliases, validation constants, the order/trade records, and the
// engine-wide error type.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ALIASES & CONSTANTS| Identifier/quantity aliases and validity bounds.                 |
// | ENUMS              | Discrete value sets (OrderSide, OrderType).                      |
// | STRUCTS            | Order and Trade records.                                         |
// | ERRORS             | EngineError and the EngineResult alias.                          |
// | TESTS              | Unit tests for construction, filling, matching and priority.     |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
//  ALIASES & CONSTANTS
//--------------------------------------------------------------------------------------------------

/// Unique identifier for orders. 0 is reserved as the null sentinel.
pub type OrderId = u64;

/// Unique identifier for trades, monotonically increasing per order book.
/// 0 is reserved as the null sentinel.
pub type TradeId = u64;

/// Order quantity in whole units.
pub type Quantity = u64;

/// Trading instrument symbol (1..=8 ASCII alphanumeric characters).
pub type Symbol = String;

/// Reserved order id, never assigned to a real order.
pub const NULL_ORDER_ID: OrderId = 0;

/// Reserved trade id, never issued by an order book.
pub const NULL_TRADE_ID: TradeId = 0;

/// Lowest price accepted for a limit order.
pub const MIN_PRICE: Decimal = dec!(0.01);

/// Highest price accepted for a limit order.
pub const MAX_PRICE: Decimal = dec!(1_000_000_000);

/// Price carried by market orders, meaning "any price".
pub const MARKET_PRICE: Decimal = Decimal::ZERO;

/// Smallest acceptable order quantity.
pub const MIN_QUANTITY: Quantity = 1;

/// Largest acceptable order quantity.
pub const MAX_QUANTITY: Quantity = 1_000_000_000;

/// Maximum symbol length in characters.
pub const MAX_SYMBOL_LEN: usize = 8;

/// Returns true if `price` is within the valid range for limit orders.
#[inline]
pub fn is_valid_price(price: Decimal) -> bool {
    price >= MIN_PRICE && price <= MAX_PRICE
}

/// Returns true if `quantity` is within the valid range.
#[inline]
pub fn is_valid_quantity(quantity: Quantity) -> bool {
    (MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity)
}

/// Returns true if `symbol` is 1..=8 ASCII alphanumeric characters.
#[inline]
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol.chars().all(|c| c.is_ascii_alphanumeric())
}

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------

/// Side of an order: bid or offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OrderSide {
    /// A buy order (bid).
    Buy,
    /// A sell order (ask/offer).
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Integer encoding used on the wire (Buy = 0, Sell = 1).
    #[inline]
    pub fn wire_code(self) -> u8 {
        match self {
            OrderSide::Buy => 0,
            OrderSide::Sell => 1,
        }
    }

    /// Decodes the wire integer encoding.
    pub fn from_wire_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OrderSide::Buy),
            1 => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Execution style of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OrderType {
    /// Executes immediately at the best available prices; never rests.
    Market,
    /// Executes at the stated price or better; the remainder rests.
    Limit,
}

impl OrderType {
    /// Integer encoding used on the wire (Market = 0, Limit = 1).
    #[inline]
    pub fn wire_code(self) -> u8 {
        match self {
            OrderType::Market => 0,
            OrderType::Limit => 1,
        }
    }

    /// Decodes the wire integer encoding.
    pub fn from_wire_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OrderType::Market),
            1 => Some(OrderType::Limit),
            _ => None,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  ERRORS
//--------------------------------------------------------------------------------------------------

/// Errors surfaced by order construction and the matching engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A validation rule was broken (order fields, fill amounts, limits).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The symbol has no registered order book.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// An order was submitted while the engine was stopped.
    #[error("engine is not running")]
    EngineNotRunning,
}

/// Type alias for Result with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------

/// A single trading intention.
///
/// All fields except `remaining_quantity` are immutable after construction;
/// `remaining_quantity` only ever decreases, through [`Order::fill`]. The
/// creation timestamp is assigned by the constructor and breaks price ties
/// when comparing priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    id: OrderId,
    symbol: Symbol,
    side: OrderSide,
    order_type: OrderType,
    price: Decimal,
    quantity: Quantity,
    remaining_quantity: Quantity,
    timestamp: DateTime<Utc>,
}

impl Order {
    /// Creates a validated order.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidArgument` when the id is the null
    /// sentinel, the symbol is empty, the quantity is out of range, a market
    /// order carries a price, or a limit price is out of range.
    pub fn new(
        id: OrderId,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        quantity: Quantity,
    ) -> EngineResult<Self> {
        let symbol = symbol.into();
        if id == NULL_ORDER_ID {
            return Err(EngineError::InvalidArgument(
                "order id cannot be the null sentinel (0)".to_string(),
            ));
        }
        if symbol.is_empty() {
            return Err(EngineError::InvalidArgument(
                "symbol cannot be empty".to_string(),
            ));
        }
        if !is_valid_quantity(quantity) {
            return Err(EngineError::InvalidArgument(format!(
                "quantity must be between {MIN_QUANTITY} and {MAX_QUANTITY}, got {quantity}"
            )));
        }
        match order_type {
            OrderType::Market => {
                if price != MARKET_PRICE {
                    return Err(EngineError::InvalidArgument(format!(
                        "market orders must have price 0, got {price}"
                    )));
                }
            }
            OrderType::Limit => {
                if !is_valid_price(price) {
                    return Err(EngineError::InvalidArgument(format!(
                        "limit price must be between {MIN_PRICE} and {MAX_PRICE}, got {price}"
                    )));
                }
            }
        }
        Ok(Self {
            id,
            symbol,
            side,
            order_type,
            price,
            quantity,
            remaining_quantity: quantity,
            timestamp: Utc::now(),
        })
    }

    /// Creates a market order (price fixed to [`MARKET_PRICE`]).
    pub fn market(
        id: OrderId,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
    ) -> EngineResult<Self> {
        Self::new(id, symbol, side, OrderType::Market, MARKET_PRICE, quantity)
    }

    #[inline]
    pub fn id(&self) -> OrderId {
        self.id
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn side(&self) -> OrderSide {
        self.side
    }

    #[inline]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    #[inline]
    pub fn price(&self) -> Decimal {
        self.price
    }

    #[inline]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    #[inline]
    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }

    #[inline]
    pub fn is_limit(&self) -> bool {
        self.order_type == OrderType::Limit
    }

    #[inline]
    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }

    #[inline]
    pub fn is_sell(&self) -> bool {
        self.side == OrderSide::Sell
    }

    /// True once the entire original quantity has traded.
    #[inline]
    pub fn is_fully_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// True when some, but not all, of the original quantity has traded.
    #[inline]
    pub fn is_partially_filled(&self) -> bool {
        self.remaining_quantity > 0 && self.remaining_quantity < self.quantity
    }

    /// Fills part of the order, reducing the remaining quantity.
    ///
    /// Returns the quantity actually filled (always `fill_quantity` on
    /// success).
    ///
    /// # Errors
    /// Returns `EngineError::InvalidArgument` if `fill_quantity` is zero or
    /// exceeds the remaining quantity.
    pub fn fill(&mut self, fill_quantity: Quantity) -> EngineResult<Quantity> {
        if fill_quantity == 0 {
            return Err(EngineError::InvalidArgument(
                "fill quantity cannot be zero".to_string(),
            ));
        }
        if fill_quantity > self.remaining_quantity {
            return Err(EngineError::InvalidArgument(format!(
                "fill quantity {fill_quantity} exceeds remaining quantity {}",
                self.remaining_quantity
            )));
        }
        self.remaining_quantity -= fill_quantity;
        Ok(fill_quantity)
    }

    /// Whether this order can trade against `other`.
    ///
    /// Orders match when they share a symbol, sit on opposite sides, and
    /// either one is a market order or the buy limit is at or above the sell
    /// limit.
    pub fn can_match_with(&self, other: &Order) -> bool {
        if self.symbol != other.symbol {
            return false;
        }
        if self.side == other.side {
            return false;
        }
        if self.is_market() || other.is_market() {
            return true;
        }
        match self.side {
            OrderSide::Buy => self.price >= other.price,
            OrderSide::Sell => self.price <= other.price,
        }
    }

    /// Price-time priority comparison for same-symbol, same-side orders.
    ///
    /// Buys: higher price wins, ties broken by earlier arrival. Sells: lower
    /// price wins, ties broken by earlier arrival. Orders on different
    /// symbols or sides are not comparable and yield `false`.
    pub fn has_higher_priority_than(&self, other: &Order) -> bool {
        if self.symbol != other.symbol || self.side != other.side {
            return false;
        }
        if self.price != other.price {
            return match self.side {
                OrderSide::Buy => self.price > other.price,
                OrderSide::Sell => self.price < other.price,
            };
        }
        self.timestamp < other.timestamp
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order{{id={}, symbol={}, side={}, type={}, price={}, qty={}, remaining={}}}",
            self.id,
            self.symbol,
            self.side,
            self.order_type,
            self.price,
            self.quantity,
            self.remaining_quantity
        )
    }
}

/// A single execution between a buy and a sell order.
///
/// Immutable once emitted. `buy_order_id` always refers to the buy side and
/// `sell_order_id` to the sell side, regardless of which order was the
/// aggressor. The execution price is the resting order's limit price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    /// Strictly increasing per order book; never 0.
    pub trade_id: TradeId,
    /// Id of the buy-side order.
    pub buy_order_id: OrderId,
    /// Id of the sell-side order.
    pub sell_order_id: OrderId,
    /// Price the trade executed at (the passive order's limit price).
    pub execution_price: Decimal,
    /// Quantity exchanged; always at least 1.
    pub quantity: Quantity,
    /// When the trade was generated.
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Creates a trade stamped with the current time.
    pub fn new(
        trade_id: TradeId,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        execution_price: Decimal,
        quantity: Quantity,
    ) -> Self {
        Self {
            trade_id,
            buy_order_id,
            sell_order_id,
            execution_price,
            quantity,
            timestamp: Utc::now(),
        }
    }

    /// Traded value (price x quantity).
    pub fn notional(&self) -> Decimal {
        self.execution_price * Decimal::from(self.quantity)
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade{{id={}, buy={}, sell={}, price={}, qty={}}}",
            self.trade_id,
            self.buy_order_id,
            self.sell_order_id,
            self.execution_price,
            self.quantity
        )
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
