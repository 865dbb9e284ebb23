// Notification sinks for trades and order updates.
//
// The engine dispatches synchronously while holding its write lock, so sinks
// must be brief and must not call back into the engine. Sinks that need to do
// real work should hand the event off, e.g. through the channel sinks below.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{info, trace};

use crate::types::{Order, Trade};

/// Receives every trade the engine executes.
pub trait TradeSink: Send + Sync {
    fn on_trade(&self, trade: &Trade);
}

/// Receives the final state of every order the engine touches.
pub trait OrderSink: Send + Sync {
    fn on_order_update(&self, order: &Order);
}

/// Sink that logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TradeSink for LogSink {
    fn on_trade(&self, trade: &Trade) {
        info!(
            trade_id = trade.trade_id,
            buy_order_id = trade.buy_order_id,
            sell_order_id = trade.sell_order_id,
            price = %trade.execution_price,
            quantity = trade.quantity,
            "trade executed"
        );
    }
}

impl OrderSink for LogSink {
    fn on_order_update(&self, order: &Order) {
        info!(
            order_id = order.id(),
            symbol = order.symbol(),
            side = %order.side(),
            remaining = order.remaining_quantity(),
            "order updated"
        );
    }
}

/// Forwards trades into a crossbeam channel without ever blocking the engine.
///
/// Events are dropped (and traced) when the receiver has gone away.
pub struct ChannelTradeSink {
    sender: Sender<Trade>,
}

impl ChannelTradeSink {
    /// Creates the sink together with the receiving end of its channel.
    pub fn new() -> (Self, Receiver<Trade>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl TradeSink for ChannelTradeSink {
    fn on_trade(&self, trade: &Trade) {
        if self.sender.try_send(trade.clone()).is_err() {
            trace!(trade_id = trade.trade_id, "trade receiver disconnected, event dropped");
        }
    }
}

/// Forwards order updates into a crossbeam channel without blocking.
pub struct ChannelOrderSink {
    sender: Sender<Order>,
}

impl ChannelOrderSink {
    pub fn new() -> (Self, Receiver<Order>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl OrderSink for ChannelOrderSink {
    fn on_order_update(&self, order: &Order) {
        if self.sender.try_send(order.clone()).is_err() {
            trace!(order_id = order.id(), "order receiver disconnected, event dropped");
        }
    }
}
