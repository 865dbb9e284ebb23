use std::sync::Arc;

use anyhow::Result;
use rust_decimal_macros::dec;
use tracing::info;

use matchbook::{
    AppConfig, LogSink, MatchingEngine, Order, OrderSide, OrderType, Server,
};

/// Seeds a small two-sided AAPL ladder so a fresh instance has something to
/// trade against.
fn seed_demo_book(engine: &MatchingEngine) -> Result<()> {
    let orders = [
        // Bids
        (1, OrderSide::Buy, dec!(150.00), 100),
        (2, OrderSide::Buy, dec!(149.95), 200),
        (3, OrderSide::Buy, dec!(149.90), 150),
        // Asks
        (4, OrderSide::Sell, dec!(150.10), 100),
        (5, OrderSide::Sell, dec!(150.15), 200),
        (6, OrderSide::Sell, dec!(150.20), 150),
    ];
    for (id, side, price, quantity) in orders {
        let order = Order::new(id, "AAPL", side, OrderType::Limit, price, quantity)?;
        engine.submit_order(order)?;
    }
    info!("seeded demo book:\n{}", engine.get_order_book_state("AAPL", 5)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (for logging)
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let engine = Arc::new(MatchingEngine::new(config.engine.clone()));
    engine.register_trade_sink(LogSink);
    engine.register_order_sink(LogSink);
    engine.start();

    for symbol in &config.symbols {
        engine.add_symbol(symbol)?;
    }
    info!(symbols = ?config.symbols, "registered symbols");

    if config.symbols.iter().any(|s| s == "AAPL") {
        seed_demo_book(&engine)?;
    }

    info!("{}", engine.get_engine_status());
    Server::new(config.listen_addr, engine).serve().await?;
    Ok(())
}
