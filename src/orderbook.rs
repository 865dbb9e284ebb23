//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading instrument.
// It maintains bid and ask orders in price-time priority (FIFO) order and
// generates trades whenever an incoming order crosses the book.
//
// | Component       | Description                                                              |
// |-----------------|--------------------------------------------------------------------------|
// | PriceLevel      | FIFO queue of resting orders at one price                                |
// | OrderBook       | Two-sided ladder + location index + per-book trade id counter            |
// | Match loop      | Fills an incoming order against the opposite ladder at passive prices    |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                  | Return Type           |
// |-----------------------|----------------------------------------------|-----------------------|
// | submit                | Match an order, rest any limit remainder     | Vec<Trade>            |
// | cancel                | Remove a resting order by id                 | bool                  |
// | best_bid / best_ask   | Top-of-book prices                           | Option<Decimal>       |
// | spread                | best_ask - best_bid                          | Option<Decimal>       |
// | bid_levels/ask_levels | (price, quantity) pairs in priority order    | Vec<(Decimal, u64)>   |
// | format_book           | Debug rendering of the top of the book       | String                |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write as _;

use rust_decimal::Decimal;
use tracing::trace;

use crate::types::{Order, OrderId, OrderSide, Quantity, Symbol, Trade, TradeId};

/// A price level: the FIFO queue of all resting orders at one price on one
/// side of the book.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<Order>,
}

impl PriceLevel {
    fn new() -> Self {
        Self::default()
    }

    /// The next order to be matched at this level, without removing it.
    pub fn peek(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of resting orders at this level.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Sum of the remaining quantities of every order at this level.
    pub fn total_quantity(&self) -> Quantity {
        self.orders.iter().map(Order::remaining_quantity).sum()
    }
}

/// Order book for a single instrument, matching with price-time priority.
///
/// Bids are iterated highest price first, asks lowest price first; within a
/// level, orders execute in arrival order. A location index maps resting
/// order ids to their (price, side) so cancels avoid scanning the ladders.
///
/// Invariants held between any two public calls:
/// - an id is in the location index iff exactly one copy of that order rests
///   in one queue;
/// - no price level with an empty queue exists;
/// - every resting order has remaining quantity > 0;
/// - `best_bid < best_ask` whenever both sides are populated.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    /// Bid ladder; `BTreeMap` ascending, so the best bid is the last key.
    bids: BTreeMap<Decimal, PriceLevel>,
    /// Ask ladder; the best ask is the first key.
    asks: BTreeMap<Decimal, PriceLevel>,
    /// OrderId -> (price, side) for O(1) cancel lookup.
    order_locations: HashMap<OrderId, (Decimal, OrderSide)>,
    /// Last issued trade id; 0 means none issued yet.
    next_trade_id: TradeId,
}

impl OrderBook {
    /// Creates an empty order book for `symbol`.
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_locations: HashMap::new(),
            next_trade_id: 0,
        }
    }

    /// The instrument this book manages.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Submits an order and attempts matching.
    ///
    /// Market orders execute against the best available prices and are never
    /// added to the book; any unfilled remainder is discarded. Limit orders
    /// match while crossed, then rest any remainder at the tail of their
    /// price level. The caller's order is mutated in place, so its final
    /// remaining quantity is observable after the call.
    ///
    /// Returns the trades generated, in execution order.
    pub fn submit(&mut self, order: &mut Order) -> Vec<Trade> {
        debug_assert_eq!(order.symbol(), self.symbol);
        let trades = self.match_incoming(order);
        if order.is_limit() && order.remaining_quantity() > 0 {
            self.rest(order.clone());
        }
        trades
    }

    /// Cancels a resting order.
    ///
    /// Returns false when the id is unknown. Removes the price level when the
    /// cancelled order was the last one resting there.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let Some((price, side)) = self.order_locations.remove(&order_id) else {
            return false;
        };
        let ladder = match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        };
        if let Some(level) = ladder.get_mut(&price) {
            if let Some(pos) = level.orders.iter().position(|o| o.id() == order_id) {
                level.orders.remove(pos);
                if level.orders.is_empty() {
                    ladder.remove(&price);
                }
                trace!(symbol = %self.symbol, order_id, "order cancelled");
                return true;
            }
        }
        false
    }

    /// A resting order by id, if present.
    pub fn resting_order(&self, order_id: OrderId) -> Option<&Order> {
        let (price, side) = self.order_locations.get(&order_id)?;
        let ladder = match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        };
        ladder
            .get(price)?
            .orders
            .iter()
            .find(|o| o.id() == order_id)
    }

    /// Highest bid price, if any bids rest.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest ask price, if any asks rest.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// `best_ask - best_bid`, when both sides are populated.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Total remaining quantity at the best bid level; 0 when no bids rest.
    pub fn best_bid_quantity(&self) -> Quantity {
        self.bids
            .values()
            .next_back()
            .map_or(0, PriceLevel::total_quantity)
    }

    /// Total remaining quantity at the best ask level; 0 when no asks rest.
    pub fn best_ask_quantity(&self) -> Quantity {
        self.asks
            .values()
            .next()
            .map_or(0, PriceLevel::total_quantity)
    }

    /// Total number of resting orders on both sides.
    pub fn order_count(&self) -> usize {
        // The location index tracks exactly the resting orders.
        self.order_locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Number of distinct bid prices.
    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask prices.
    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    /// The first `max_levels` bid levels as (price, total quantity) pairs,
    /// best price first.
    pub fn bid_levels(&self, max_levels: usize) -> Vec<(Decimal, Quantity)> {
        self.bids
            .iter()
            .rev()
            .take(max_levels)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// The first `max_levels` ask levels as (price, total quantity) pairs,
    /// best price first.
    pub fn ask_levels(&self, max_levels: usize) -> Vec<(Decimal, Quantity)> {
        self.asks
            .iter()
            .take(max_levels)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Renders the top of the book for debugging.
    pub fn format_book(&self, max_levels: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== ORDER BOOK {} ===", self.symbol);
        let _ = writeln!(out, "ASKS (lowest first):");
        for (price, level) in self.asks.iter().take(max_levels) {
            let _ = writeln!(
                out,
                "  ASK {price} [{} qty, {} orders]",
                level.total_quantity(),
                level.len()
            );
        }
        match self.spread() {
            Some(spread) => {
                let _ = writeln!(out, "SPREAD: {spread}");
            }
            None => {
                let _ = writeln!(out, "SPREAD: N/A");
            }
        }
        let _ = writeln!(out, "BIDS (highest first):");
        for (price, level) in self.bids.iter().rev().take(max_levels) {
            let _ = writeln!(
                out,
                "  BID {price} [{} qty, {} orders]",
                level.total_quantity(),
                level.len()
            );
        }
        let _ = writeln!(out, "Total Orders: {}", self.order_count());
        out
    }

    /// Drops all resting orders and resets the trade id counter.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.order_locations.clear();
        self.next_trade_id = 0;
    }

    /// Core match loop: fills `agg` against the opposite ladder until it is
    /// exhausted, the ladder empties, or (for limit orders) prices stop
    /// crossing. Trades always execute at the passive order's price.
    fn match_incoming(&mut self, agg: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        loop {
            if agg.remaining_quantity() == 0 {
                break;
            }
            let ladder = match agg.side() {
                OrderSide::Buy => &mut self.asks,
                OrderSide::Sell => &mut self.bids,
            };
            let best_price = match agg.side() {
                OrderSide::Buy => ladder.keys().next().copied(),
                OrderSide::Sell => ladder.keys().next_back().copied(),
            };
            let Some(best_price) = best_price else {
                break;
            };
            let Some(level) = ladder.get_mut(&best_price) else {
                break;
            };
            if level.is_empty() {
                // Levels are pruned as they drain; an empty one is stale.
                ladder.remove(&best_price);
                continue;
            }
            {
                let passive = level.peek().expect("level checked non-empty");
                if agg.is_limit() && !agg.can_match_with(passive) {
                    break;
                }
            }
            let passive = level
                .orders
                .front_mut()
                .expect("level checked non-empty");
            let trade_quantity = agg.remaining_quantity().min(passive.remaining_quantity());
            let trade_price = passive.price();
            let (buy_order_id, sell_order_id) = match agg.side() {
                OrderSide::Buy => (agg.id(), passive.id()),
                OrderSide::Sell => (passive.id(), agg.id()),
            };
            agg.fill(trade_quantity)
                .expect("trade quantity clamped to aggressor remaining");
            passive
                .fill(trade_quantity)
                .expect("trade quantity clamped to passive remaining");
            let passive_id = passive.id();
            let passive_filled = passive.is_fully_filled();

            self.next_trade_id += 1;
            let trade = Trade::new(
                self.next_trade_id,
                buy_order_id,
                sell_order_id,
                trade_price,
                trade_quantity,
            );
            trace!(symbol = %self.symbol, trade_id = trade.trade_id,
                   price = %trade_price, quantity = trade_quantity, "trade executed");
            trades.push(trade);

            let mut level_drained = false;
            if passive_filled {
                level.orders.pop_front();
                self.order_locations.remove(&passive_id);
                level_drained = level.orders.is_empty();
            }
            if level_drained {
                ladder.remove(&best_price);
            }
        }
        trades
    }

    /// Rests a limit order at the tail of its price level and records its
    /// location for cancellation.
    fn rest(&mut self, order: Order) {
        let price = order.price();
        let side = order.side();
        let previous = self.order_locations.insert(order.id(), (price, side));
        debug_assert!(previous.is_none(), "duplicate resting order id");
        let ladder = match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        };
        ladder
            .entry(price)
            .or_insert_with(PriceLevel::new)
            .orders
            .push_back(order);
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
