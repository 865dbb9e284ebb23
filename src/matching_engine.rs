//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the multi-symbol coordinator: it owns one OrderBook
// per registered symbol, validates and routes incoming orders, serialises
// writes behind a reader-writer lock, fans trade/order notifications out to
// registered sinks, and serves market-data snapshots.
//
// | Component        | Description                                                  |
// |------------------|--------------------------------------------------------------|
// | MatchingEngine   | Symbol -> OrderBook map, validation, routing, broadcast      |
// | EngineStatistics | Counter snapshot with uptime-derived rates                   |
//
// Thread safety: a single parking_lot RwLock serialises all mutating calls;
// market-data queries share the read lock; the processed/executed counters
// and the running flag are atomics readable without the lock. Sinks are
// invoked while the write lock is held and must not re-enter the engine.
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::depth::MarketDepth;
use crate::events::{OrderSink, TradeSink};
use crate::orderbook::OrderBook;
use crate::types::{
    is_valid_symbol, EngineError, EngineResult, Order, OrderId, OrderType, Symbol, Trade,
};

/// Snapshot of engine activity counters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatistics {
    /// Orders accepted by `submit_order` since start / last reset.
    pub orders_processed: u64,
    /// Trades executed since start / last reset.
    pub trades_executed: u64,
    /// Symbols with a registered order book.
    pub symbols_active: usize,
    /// Time since start / last reset.
    pub uptime: Duration,
    /// Orders per second over the uptime window; 0 at zero uptime.
    pub orders_per_second: f64,
    /// Trades per second over the uptime window; 0 at zero uptime.
    pub trades_per_second: f64,
}

/// State guarded by the engine's reader-writer lock.
struct EngineInner {
    books: HashMap<Symbol, OrderBook>,
    config: EngineConfig,
    trade_sinks: Vec<Arc<dyn TradeSink>>,
    order_sinks: Vec<Arc<dyn OrderSink>>,
    start_time: Instant,
}

/// Multi-symbol matching engine.
///
/// Symbols must be registered through [`MatchingEngine::add_symbol`] before
/// orders for them are accepted; submission never creates books implicitly.
/// All methods take `&self`: the engine is designed to be shared across
/// threads behind an `Arc`.
pub struct MatchingEngine {
    inner: RwLock<EngineInner>,
    orders_processed: AtomicU64,
    trades_executed: AtomicU64,
    is_running: AtomicBool,
}

impl MatchingEngine {
    /// Creates a stopped engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: RwLock::new(EngineInner {
                books: HashMap::new(),
                config,
                trade_sinks: Vec::new(),
                order_sinks: Vec::new(),
                start_time: Instant::now(),
            }),
            orders_processed: AtomicU64::new(0),
            trades_executed: AtomicU64::new(0),
            is_running: AtomicBool::new(false),
        }
    }

    /// Transitions to Running; a no-op when already running. Resets the
    /// uptime reference point.
    pub fn start(&self) {
        let mut inner = self.inner.write();
        inner.start_time = Instant::now();
        self.is_running.store(true, Ordering::Release);
        debug!("engine started");
    }

    /// Transitions to Stopped. Subsequent submissions fail until restarted.
    pub fn stop(&self) {
        let _inner = self.inner.write();
        self.is_running.store(false, Ordering::Release);
        debug!("engine stopped");
    }

    /// Whether the engine currently accepts orders.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Registers a symbol, creating an empty order book. Idempotent.
    ///
    /// # Errors
    /// `InvalidArgument` when the symbol is not 1..=8 ASCII alphanumeric
    /// characters.
    pub fn add_symbol(&self, symbol: &str) -> EngineResult<()> {
        if !is_valid_symbol(symbol) {
            return Err(EngineError::InvalidArgument(format!(
                "invalid symbol: {symbol:?}"
            )));
        }
        let mut inner = self.inner.write();
        inner
            .books
            .entry(symbol.to_string())
            .or_insert_with(|| OrderBook::new(symbol));
        Ok(())
    }

    /// Removes a symbol's book, but only when no orders rest in it.
    pub fn remove_symbol(&self, symbol: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.books.get(symbol) {
            Some(book) if book.order_count() == 0 => {
                inner.books.remove(symbol);
                true
            }
            _ => false,
        }
    }

    /// Submits an order for matching.
    ///
    /// Validation happens before any state changes: the engine must be
    /// running, the symbol well-formed, price and quantity within the
    /// configured bounds, and (with strict validation) the per-symbol and
    /// symbol-count risk limits respected. The symbol's book must have been
    /// registered via [`MatchingEngine::add_symbol`].
    ///
    /// On success the resulting trades are returned in execution order, and
    /// every registered sink sees the trades followed by the submitted
    /// order's final state.
    pub fn submit_order(&self, mut order: Order) -> EngineResult<Vec<Trade>> {
        let mut inner = self.inner.write();
        if !self.is_running.load(Ordering::Acquire) {
            return Err(EngineError::EngineNotRunning);
        }
        Self::validate_order(&inner.config, &order)?;
        if inner.config.strict_validation {
            Self::check_risk_limits(&inner, &order)?;
        }

        let book = inner
            .books
            .get_mut(order.symbol())
            .ok_or_else(|| EngineError::SymbolNotFound(order.symbol().to_string()))?;
        let trades = book.submit(&mut order);

        self.orders_processed.fetch_add(1, Ordering::AcqRel);
        self.trades_executed
            .fetch_add(trades.len() as u64, Ordering::AcqRel);
        debug!(
            order_id = order.id(),
            symbol = order.symbol(),
            trades = trades.len(),
            remaining = order.remaining_quantity(),
            "order processed"
        );

        for trade in &trades {
            Self::broadcast_trade(&inner, trade);
        }
        Self::broadcast_order_update(&inner, &order);
        Ok(trades)
    }

    /// Cancels a resting order.
    ///
    /// Returns false when the symbol or the order id is unknown. On success
    /// the cancelled order's final state is broadcast to the order sinks.
    pub fn cancel_order(&self, order_id: OrderId, symbol: &str) -> bool {
        let mut inner = self.inner.write();
        let snapshot = {
            let Some(book) = inner.books.get_mut(symbol) else {
                return false;
            };
            let snapshot = book.resting_order(order_id).cloned();
            if !book.cancel(order_id) {
                return false;
            }
            snapshot
        };
        debug!(order_id, symbol, "order cancelled");
        if let Some(order) = snapshot {
            Self::broadcast_order_update(&inner, &order);
        }
        true
    }

    /// Cancel-and-replace: the replacement keeps the original's id and side,
    /// takes a fresh timestamp, and therefore loses time priority.
    ///
    /// The replacement is validated before the original is cancelled; an
    /// invalid price or quantity leaves the book untouched and returns
    /// false. Resting orders are always limit orders, so the replacement is
    /// a limit order at `new_price`.
    pub fn modify_order(
        &self,
        order_id: OrderId,
        symbol: &str,
        new_price: Decimal,
        new_quantity: u64,
    ) -> bool {
        let mut inner = self.inner.write();
        let (trades, replacement) = {
            let Some(book) = inner.books.get_mut(symbol) else {
                return false;
            };
            let Some(side) = book.resting_order(order_id).map(Order::side) else {
                return false;
            };
            let Ok(mut replacement) =
                Order::new(order_id, symbol, side, OrderType::Limit, new_price, new_quantity)
            else {
                return false;
            };
            if !book.cancel(order_id) {
                return false;
            }
            let trades = book.submit(&mut replacement);
            (trades, replacement)
        };

        self.trades_executed
            .fetch_add(trades.len() as u64, Ordering::AcqRel);
        debug!(order_id, symbol, trades = trades.len(), "order modified");

        for trade in &trades {
            Self::broadcast_trade(&inner, trade);
        }
        Self::broadcast_order_update(&inner, &replacement);
        true
    }

    /// Best bid for `symbol`; None when the symbol is unknown or has no bids.
    pub fn get_best_bid(&self, symbol: &str) -> Option<Decimal> {
        let inner = self.inner.read();
        inner.books.get(symbol)?.best_bid()
    }

    /// Best ask for `symbol`; None when the symbol is unknown or has no asks.
    pub fn get_best_ask(&self, symbol: &str) -> Option<Decimal> {
        let inner = self.inner.read();
        inner.books.get(symbol)?.best_ask()
    }

    /// Spread for `symbol`; None when either side is empty.
    pub fn get_spread(&self, symbol: &str) -> Option<Decimal> {
        let inner = self.inner.read();
        inner.books.get(symbol)?.spread()
    }

    /// Depth snapshot with up to `levels` levels per side.
    pub fn get_market_depth(&self, symbol: &str, levels: usize) -> EngineResult<MarketDepth> {
        let inner = self.inner.read();
        let book = inner
            .books
            .get(symbol)
            .ok_or_else(|| EngineError::SymbolNotFound(symbol.to_string()))?;
        Ok(MarketDepth::capture(book, levels))
    }

    /// All registered symbols, sorted for stable output.
    pub fn get_active_symbols(&self) -> Vec<Symbol> {
        let inner = self.inner.read();
        let mut symbols: Vec<Symbol> = inner.books.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Debug rendering of one symbol's book.
    pub fn get_order_book_state(&self, symbol: &str, max_levels: usize) -> EngineResult<String> {
        let inner = self.inner.read();
        let book = inner
            .books
            .get(symbol)
            .ok_or_else(|| EngineError::SymbolNotFound(symbol.to_string()))?;
        Ok(book.format_book(max_levels))
    }

    /// Registers a sink for executed trades.
    pub fn register_trade_sink(&self, sink: impl TradeSink + 'static) {
        let mut inner = self.inner.write();
        inner.trade_sinks.push(Arc::new(sink));
    }

    /// Registers a sink for order updates.
    pub fn register_order_sink(&self, sink: impl OrderSink + 'static) {
        let mut inner = self.inner.write();
        inner.order_sinks.push(Arc::new(sink));
    }

    /// Drops every registered sink.
    pub fn unregister_all_sinks(&self) {
        let mut inner = self.inner.write();
        inner.trade_sinks.clear();
        inner.order_sinks.clear();
    }

    /// Current statistics. Counters are read atomically; rates are derived
    /// from uptime and report 0 when no time has elapsed.
    pub fn get_statistics(&self) -> EngineStatistics {
        let inner = self.inner.read();
        let orders_processed = self.orders_processed.load(Ordering::Acquire);
        let trades_executed = self.trades_executed.load(Ordering::Acquire);
        let uptime = inner.start_time.elapsed();
        let secs = uptime.as_secs_f64();
        let (orders_per_second, trades_per_second) = if secs > 0.0 {
            (orders_processed as f64 / secs, trades_executed as f64 / secs)
        } else {
            (0.0, 0.0)
        };
        EngineStatistics {
            orders_processed,
            trades_executed,
            symbols_active: inner.books.len(),
            uptime,
            orders_per_second,
            trades_per_second,
        }
    }

    /// One-line-per-metric status report for monitoring.
    pub fn get_engine_status(&self) -> String {
        let stats = self.get_statistics();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Engine running: {}",
            if self.is_running() { "YES" } else { "NO" }
        );
        let _ = writeln!(
            out,
            "Symbols: {}, Orders: {}, Trades: {}",
            stats.symbols_active, stats.orders_processed, stats.trades_executed
        );
        let _ = write!(out, "Uptime (ms): {}", stats.uptime.as_millis());
        out
    }

    /// Zeroes the counters and restarts the uptime clock.
    pub fn reset_statistics(&self) {
        let mut inner = self.inner.write();
        self.orders_processed.store(0, Ordering::Release);
        self.trades_executed.store(0, Ordering::Release);
        inner.start_time = Instant::now();
    }

    /// Replaces the engine configuration.
    pub fn update_config(&self, config: EngineConfig) {
        let mut inner = self.inner.write();
        inner.config = config;
    }

    /// The current engine configuration.
    pub fn get_config(&self) -> EngineConfig {
        self.inner.read().config.clone()
    }

    /// Empties every registered book and resets their trade counters.
    /// Symbols stay registered.
    pub fn clear_all_order_books(&self) {
        let mut inner = self.inner.write();
        for book in inner.books.values_mut() {
            book.clear();
        }
    }

    fn validate_order(config: &EngineConfig, order: &Order) -> EngineResult<()> {
        if !is_valid_symbol(order.symbol()) {
            return Err(EngineError::InvalidArgument(format!(
                "invalid symbol: {:?}",
                order.symbol()
            )));
        }
        if order.price() > config.max_order_price {
            return Err(EngineError::InvalidArgument(format!(
                "price {} exceeds configured maximum {}",
                order.price(),
                config.max_order_price
            )));
        }
        if order.quantity() > config.max_order_quantity {
            return Err(EngineError::InvalidArgument(format!(
                "quantity {} exceeds configured maximum {}",
                order.quantity(),
                config.max_order_quantity
            )));
        }
        Ok(())
    }

    fn check_risk_limits(inner: &EngineInner, order: &Order) -> EngineResult<()> {
        if let Some(book) = inner.books.get(order.symbol()) {
            if book.order_count() >= inner.config.max_orders_per_symbol {
                return Err(EngineError::InvalidArgument(format!(
                    "symbol {} has reached the resting order limit of {}",
                    order.symbol(),
                    inner.config.max_orders_per_symbol
                )));
            }
        }
        if inner.books.len() > inner.config.max_symbols {
            return Err(EngineError::InvalidArgument(format!(
                "active symbol count exceeds the limit of {}",
                inner.config.max_symbols
            )));
        }
        Ok(())
    }

    // Sinks run while the write lock is held; a panicking sink is contained
    // so it cannot poison engine state.
    fn broadcast_trade(inner: &EngineInner, trade: &Trade) {
        for sink in &inner.trade_sinks {
            let sink = Arc::clone(sink);
            if catch_unwind(AssertUnwindSafe(|| sink.on_trade(trade))).is_err() {
                warn!(trade_id = trade.trade_id, "trade sink panicked");
            }
        }
    }

    fn broadcast_order_update(inner: &EngineInner, order: &Order) {
        for sink in &inner.order_sinks {
            let sink = Arc::clone(sink);
            if catch_unwind(AssertUnwindSafe(|| sink.on_order_update(order))).is_err() {
                warn!(order_id = order.id(), "order sink panicked");
            }
        }
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
