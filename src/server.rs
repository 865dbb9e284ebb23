//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// TCP front end for the matching engine. Accepts connections, reads one
// request per newline-terminated line, and answers with the protocol's
// response lines. Malformed input answers ERROR| and keeps the connection
// open. The engine is shared behind an Arc; request dispatch itself is
// synchronous and unit-testable without sockets.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::depth::DEFAULT_DEPTH_LEVELS;
use crate::matching_engine::MatchingEngine;
use crate::protocol::{Request, Response};
use crate::types::Order;

/// Line-protocol server wrapping a shared [`MatchingEngine`].
pub struct Server {
    addr: SocketAddr,
    engine: Arc<MatchingEngine>,
}

impl Server {
    pub fn new(addr: SocketAddr, engine: Arc<MatchingEngine>) -> Self {
        Self { addr, engine }
    }

    /// Binds and serves until the task is aborted.
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "matching engine listening");
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "client connected");
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                if let Err(err) = handle_connection(engine, stream).await {
                    warn!(%peer, %err, "connection ended with error");
                } else {
                    debug!(%peer, "client disconnected");
                }
            });
        }
    }
}

async fn handle_connection(
    engine: Arc<MatchingEngine>,
    stream: TcpStream,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        for response in dispatch(&engine, &line) {
            writer.write_all(response.to_string().as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
    }
    Ok(())
}

/// Translates one request line into engine calls and response lines.
///
/// A submission yields one `TRADE|` line per execution, in generation order,
/// followed by a terminal `ACCEPTED|` line.
pub fn dispatch(engine: &MatchingEngine, line: &str) -> Vec<Response> {
    let request = match line.parse::<Request>() {
        Ok(request) => request,
        Err(err) => {
            return vec![Response::Error {
                reason: err.to_string(),
            }]
        }
    };
    match request {
        Request::SubmitOrder {
            id,
            symbol,
            side,
            order_type,
            price,
            quantity,
        } => {
            let order = match Order::new(id, symbol, side, order_type, price, quantity) {
                Ok(order) => order,
                Err(err) => {
                    return vec![Response::Error {
                        reason: err.to_string(),
                    }]
                }
            };
            match engine.submit_order(order) {
                Ok(trades) => {
                    let trade_count = trades.len();
                    let mut responses: Vec<Response> =
                        trades.into_iter().map(Response::Trade).collect();
                    responses.push(Response::Accepted {
                        order_id: id,
                        trade_count,
                    });
                    responses
                }
                Err(err) => vec![Response::Error {
                    reason: err.to_string(),
                }],
            }
        }
        Request::CancelOrder { id, symbol } => vec![Response::Cancelled {
            order_id: id,
            ok: engine.cancel_order(id, &symbol),
        }],
        Request::ModifyOrder {
            id,
            symbol,
            new_price,
            new_quantity,
        } => vec![Response::Modified {
            order_id: id,
            ok: engine.modify_order(id, &symbol, new_price, new_quantity),
        }],
        Request::GetBestBid { symbol } => {
            let price = engine.get_best_bid(&symbol);
            vec![Response::BestBid { symbol, price }]
        }
        Request::GetBestAsk { symbol } => {
            let price = engine.get_best_ask(&symbol);
            vec![Response::BestAsk { symbol, price }]
        }
        Request::GetSpread { symbol } => {
            let spread = engine.get_spread(&symbol);
            vec![Response::Spread { symbol, spread }]
        }
        Request::GetMarketDepth { symbol, levels } => {
            let levels = if levels == 0 {
                DEFAULT_DEPTH_LEVELS
            } else {
                levels
            };
            match engine.get_market_depth(&symbol, levels) {
                Ok(depth) => vec![Response::Depth(depth)],
                Err(err) => vec![Response::Error {
                    reason: err.to_string(),
                }],
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> MatchingEngine {
        let engine = MatchingEngine::new(EngineConfig::default());
        engine.start();
        engine.add_symbol("AAPL").expect("valid symbol");
        engine
    }

    fn lines(engine: &MatchingEngine, line: &str) -> Vec<String> {
        dispatch(engine, line)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_submit_without_match_acks() {
        let engine = engine();
        let responses = lines(&engine, "SUBMIT_ORDER|1,AAPL,0,1,100.00,10");
        assert_eq!(responses, vec!["ACCEPTED|1,0".to_string()]);
    }

    #[test]
    fn test_submit_crossing_emits_trades_then_ack() {
        let engine = engine();
        lines(&engine, "SUBMIT_ORDER|1,AAPL,0,1,150.00,100");
        let responses = lines(&engine, "SUBMIT_ORDER|2,AAPL,1,1,149.00,60");
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0], "TRADE|1,1,2,150.00,60");
        assert_eq!(responses[1], "ACCEPTED|2,1");
    }

    #[test]
    fn test_cancel_reports_outcome() {
        let engine = engine();
        lines(&engine, "SUBMIT_ORDER|7,AAPL,0,1,99.00,10");
        assert_eq!(
            lines(&engine, "CANCEL_ORDER|7,AAPL"),
            vec!["CANCELLED|7,true".to_string()]
        );
        assert_eq!(
            lines(&engine, "CANCEL_ORDER|7,AAPL"),
            vec!["CANCELLED|7,false".to_string()]
        );
    }

    #[test]
    fn test_market_data_queries() {
        let engine = engine();
        lines(&engine, "SUBMIT_ORDER|1,AAPL,0,1,99.00,10");
        lines(&engine, "SUBMIT_ORDER|2,AAPL,1,1,101.00,10");

        assert_eq!(
            lines(&engine, "GET_BEST_BID|AAPL"),
            vec!["BEST_BID|AAPL,99.00".to_string()]
        );
        assert_eq!(
            lines(&engine, "GET_BEST_ASK|AAPL"),
            vec!["BEST_ASK|AAPL,101.00".to_string()]
        );
        assert_eq!(
            lines(&engine, "GET_SPREAD|AAPL"),
            vec!["SPREAD|AAPL,2.00".to_string()]
        );

        let depth = lines(&engine, "GET_MARKET_DEPTH|AAPL,5");
        assert_eq!(depth.len(), 1);
        assert!(depth[0].starts_with("DEPTH|{"));
        assert!(depth[0].contains("\"symbol\":\"AAPL\""));
    }

    #[test]
    fn test_unknown_symbol_and_malformed_input() {
        let engine = engine();
        let responses = lines(&engine, "SUBMIT_ORDER|1,MSFT,0,1,100.00,10");
        assert_eq!(responses, vec!["ERROR|symbol not found: MSFT".to_string()]);

        let responses = lines(&engine, "garbage line");
        assert!(responses[0].starts_with("ERROR|"));

        let responses = lines(&engine, "SUBMIT_ORDER|0,AAPL,0,1,100.00,10");
        assert!(responses[0].starts_with("ERROR|invalid argument"));
    }

    #[test]
    fn test_best_bid_empty_book() {
        let engine = engine();
        assert_eq!(
            lines(&engine, "GET_BEST_BID|AAPL"),
            vec!["BEST_BID|AAPL,NONE".to_string()]
        );
    }
}
