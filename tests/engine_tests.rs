//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// End-to-end scenarios against the public engine surface: crossing orders,
// market sweeps, FIFO fairness, cancel/modify round trips, symbol isolation,
// and a multi-threaded smoke test.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::thread;

use rust_decimal_macros::dec;

use matchbook::{
    ChannelTradeSink, EngineConfig, EngineError, MatchingEngine, Order, OrderId, OrderSide,
    OrderType, Quantity,
};

fn running_engine(symbols: &[&str]) -> MatchingEngine {
    let engine = MatchingEngine::new(EngineConfig::default());
    engine.start();
    for symbol in symbols {
        engine.add_symbol(symbol).expect("valid symbol");
    }
    engine
}

fn limit(
    id: OrderId,
    symbol: &str,
    side: OrderSide,
    price: rust_decimal::Decimal,
    quantity: Quantity,
) -> Order {
    Order::new(id, symbol, side, OrderType::Limit, price, quantity).expect("valid test order")
}

// S1: a crossing limit order executes at the passive order's price.
#[test]
fn crossing_limit_executes_at_passive_price() {
    let engine = running_engine(&["A"]);
    engine
        .submit_order(limit(1, "A", OrderSide::Buy, dec!(150.00), 100))
        .expect("submit L1");
    let trades = engine
        .submit_order(limit(2, "A", OrderSide::Sell, dec!(149.00), 60))
        .expect("submit L2");

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].execution_price, dec!(150.00));
    assert_eq!(trades[0].quantity, 60);
    assert_eq!(trades[0].buy_order_id, 1);
    assert_eq!(trades[0].sell_order_id, 2);

    assert_eq!(engine.get_best_bid("A"), Some(dec!(150.00)));
    let depth = engine.get_market_depth("A", 5).expect("depth");
    assert_eq!(depth.bids[0].quantity, 40);
    assert!(depth.asks.is_empty());
}

// S2: a market buy sweeps the ask ladder across price levels.
#[test]
fn market_buy_sweeps_two_levels() {
    let engine = running_engine(&["A"]);
    engine
        .submit_order(limit(4, "A", OrderSide::Sell, dec!(100.10), 100))
        .expect("submit O4");
    engine
        .submit_order(limit(5, "A", OrderSide::Sell, dec!(100.15), 200))
        .expect("submit O5");

    let market = Order::market(6, "A", OrderSide::Buy, 150).expect("valid market order");
    let trades = engine.submit_order(market).expect("submit market");

    assert_eq!(trades.len(), 2);
    assert_eq!(
        (trades[0].execution_price, trades[0].quantity),
        (dec!(100.10), 100)
    );
    assert_eq!(
        (trades[1].execution_price, trades[1].quantity),
        (dec!(100.15), 50)
    );
    assert_eq!(engine.get_best_ask("A"), Some(dec!(100.15)));
    let depth = engine.get_market_depth("A", 5).expect("depth");
    assert_eq!(depth.asks[0].quantity, 150);
}

// S3: FIFO within one price level.
#[test]
fn fifo_within_a_level() {
    let engine = running_engine(&["A"]);
    engine
        .submit_order(limit(1, "A", OrderSide::Buy, dec!(100.00), 50))
        .expect("submit O1");
    engine
        .submit_order(limit(2, "A", OrderSide::Buy, dec!(100.00), 50))
        .expect("submit O2");

    let trades = engine
        .submit_order(limit(3, "A", OrderSide::Sell, dec!(100.00), 60))
        .expect("submit aggressor");

    assert_eq!(trades.len(), 2);
    assert_eq!((trades[0].buy_order_id, trades[0].quantity), (1, 50));
    assert_eq!((trades[1].buy_order_id, trades[1].quantity), (2, 10));

    // O1 fully filled and gone; O2 remains with 40
    assert!(!engine.cancel_order(1, "A"));
    let depth = engine.get_market_depth("A", 5).expect("depth");
    assert_eq!(depth.bids[0].quantity, 40);
}

// S4: cancel removes the order and its emptied level; a repeat cancel
// reports absence.
#[test]
fn cancel_round_trip() {
    let engine = running_engine(&["A"]);
    engine
        .submit_order(limit(7, "A", OrderSide::Buy, dec!(99.00), 10))
        .expect("submit O7");

    assert!(engine.cancel_order(7, "A"));
    assert_eq!(engine.get_best_bid("A"), None);
    assert!(!engine.cancel_order(7, "A"));
}

// S5: books never interact across symbols.
#[test]
fn symbols_are_isolated() {
    let engine = running_engine(&["A", "B"]);
    engine
        .submit_order(limit(1, "A", OrderSide::Sell, dec!(100.00), 50))
        .expect("submit A ask");

    let market = Order::market(2, "B", OrderSide::Buy, 10).expect("valid market order");
    let trades = engine.submit_order(market).expect("submit B market");
    assert!(trades.is_empty());
    assert_eq!(engine.get_best_ask("A"), Some(dec!(100.00)));
    assert_eq!(engine.get_best_ask("B"), None);
}

// S6: modifying an order reinserts it with a fresh timestamp, behind
// same-priced peers.
#[test]
fn modify_loses_time_priority() {
    let engine = running_engine(&["A"]);
    engine
        .submit_order(limit(1, "A", OrderSide::Buy, dec!(100.00), 10))
        .expect("submit O1");
    engine
        .submit_order(limit(2, "A", OrderSide::Buy, dec!(100.00), 10))
        .expect("submit O2");

    assert!(engine.modify_order(1, "A", dec!(100.00), 10));

    let trades = engine
        .submit_order(limit(3, "A", OrderSide::Sell, dec!(100.00), 10))
        .expect("submit aggressor");
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].buy_order_id, 2);
}

#[test]
fn add_then_remove_symbol_restores_state() {
    let engine = running_engine(&[]);
    assert!(engine.get_active_symbols().is_empty());
    engine.add_symbol("NEW").expect("valid symbol");
    assert!(engine.remove_symbol("NEW"));
    assert!(engine.get_active_symbols().is_empty());
}

#[test]
fn market_order_on_empty_book_returns_no_trades() {
    let engine = running_engine(&["A"]);
    let market = Order::market(1, "A", OrderSide::Buy, 100).expect("valid market order");
    let trades = engine.submit_order(market).expect("submit");
    assert!(trades.is_empty());
    let depth = engine.get_market_depth("A", 5).expect("depth");
    assert_eq!(depth.total_orders, 0);
}

#[test]
fn boundary_validation_is_enforced() {
    let engine = running_engine(&["A"]);

    // Order-level: id 0, zero quantity, out-of-range prices
    assert!(Order::new(0, "A", OrderSide::Buy, OrderType::Limit, dec!(100), 10).is_err());
    assert!(Order::new(1, "A", OrderSide::Buy, OrderType::Limit, dec!(100), 0).is_err());
    assert!(Order::new(1, "A", OrderSide::Buy, OrderType::Limit, dec!(0.001), 10).is_err());

    // Engine-level: unknown and malformed symbols
    let unknown = limit(1, "ZZZ", OrderSide::Buy, dec!(100), 10);
    assert_eq!(
        engine.submit_order(unknown),
        Err(EngineError::SymbolNotFound("ZZZ".to_string()))
    );
    let malformed = limit(2, "TOOLONGSYM", OrderSide::Buy, dec!(100), 10);
    assert!(matches!(
        engine.submit_order(malformed),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn trade_ids_increase_across_submissions() {
    let engine = running_engine(&["A"]);
    let (sink, trades_rx) = ChannelTradeSink::new();
    engine.register_trade_sink(sink);

    for i in 0..5u64 {
        engine
            .submit_order(limit(i * 2 + 1, "A", OrderSide::Sell, dec!(100.00), 10))
            .expect("submit ask");
        engine
            .submit_order(limit(i * 2 + 2, "A", OrderSide::Buy, dec!(100.00), 10))
            .expect("submit bid");
    }

    let ids: Vec<u64> = trades_rx.try_iter().map(|t| t.trade_id).collect();
    assert_eq!(ids.len(), 5);
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn fill_conservation_through_the_engine() {
    let engine = running_engine(&["A"]);
    engine
        .submit_order(limit(1, "A", OrderSide::Sell, dec!(100.00), 40))
        .expect("submit ask 1");
    engine
        .submit_order(limit(2, "A", OrderSide::Sell, dec!(100.50), 25))
        .expect("submit ask 2");

    let trades = engine
        .submit_order(limit(3, "A", OrderSide::Buy, dec!(101.00), 100))
        .expect("submit bid");
    let traded: Quantity = trades.iter().map(|t| t.quantity).sum();
    assert_eq!(traded, 65);

    // The remainder rests; the book is uncrossed
    let depth = engine.get_market_depth("A", 5).expect("depth");
    assert_eq!(depth.best_bid, Some(dec!(101.00)));
    assert_eq!(depth.bids[0].quantity, 35);
    assert_eq!(depth.best_ask, None);
}

#[test]
fn statistics_track_orders_and_trades() {
    let engine = running_engine(&["A"]);
    engine
        .submit_order(limit(1, "A", OrderSide::Sell, dec!(100.00), 10))
        .expect("submit ask");
    engine
        .submit_order(limit(2, "A", OrderSide::Buy, dec!(100.00), 10))
        .expect("submit bid");

    let stats = engine.get_statistics();
    assert_eq!(stats.orders_processed, 2);
    assert_eq!(stats.trades_executed, 1);
    assert_eq!(stats.symbols_active, 1);
}

// Writers on several threads, readers interleaved; afterwards every book
// must satisfy the uncrossed-at-rest invariant and the counters must add up.
#[test]
fn concurrent_submissions_keep_books_consistent() {
    let engine = Arc::new(running_engine(&["A", "B"]));
    let orders_per_thread = 50u64;

    let mut handles = Vec::new();
    for t in 0..4u64 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let symbol = if t % 2 == 0 { "A" } else { "B" };
            let side = if t < 2 { OrderSide::Buy } else { OrderSide::Sell };
            let price = if side == OrderSide::Buy {
                dec!(99.00)
            } else {
                dec!(101.00)
            };
            for i in 0..orders_per_thread {
                let id = t * 10_000 + i + 1;
                let order = Order::new(id, symbol, side, OrderType::Limit, price, 10)
                    .expect("valid order");
                engine.submit_order(order).expect("submit");
            }
        }));
    }
    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..200 {
                let _ = engine.get_market_depth("A", 5);
                let _ = engine.get_best_bid("B");
                let _ = engine.get_statistics();
            }
        })
    };
    for handle in handles {
        handle.join().expect("writer thread");
    }
    reader.join().expect("reader thread");

    let stats = engine.get_statistics();
    assert_eq!(stats.orders_processed, 4 * orders_per_thread);

    for symbol in ["A", "B"] {
        let depth = engine.get_market_depth(symbol, 10).expect("depth");
        if let (Some(bid), Some(ask)) = (depth.best_bid, depth.best_ask) {
            assert!(bid < ask, "{symbol} book crossed at rest: {bid} >= {ask}");
        }
    }
}
