//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Line-delimited text protocol for driving the engine over a socket. Each
// message is one `\n`-terminated line of the form `<VERB>|<PAYLOAD>` with a
// comma-separated payload.
//
// Requests:
//   SUBMIT_ORDER|<id>,<symbol>,<side:int>,<type:int>,<price>,<quantity>
//   CANCEL_ORDER|<id>,<symbol>
//   MODIFY_ORDER|<id>,<symbol>,<new_price>,<new_quantity>
//   GET_BEST_BID|<symbol>   GET_BEST_ASK|<symbol>   GET_SPREAD|<symbol>
//   GET_MARKET_DEPTH|<symbol>,<levels>
//
// Responses:
//   TRADE|<trade_id>,<buy_id>,<sell_id>,<price>,<qty>   (one per execution)
//   ACCEPTED|<id>,<trade_count>
//   CANCELLED|<id>,<ok>       MODIFIED|<id>,<ok>
//   BEST_BID|<symbol>,<price|NONE>   BEST_ASK|...   SPREAD|...
//   DEPTH|<json>              ERROR|<reason>
//
// Side ints: Buy = 0, Sell = 1. Type ints: Market = 0, Limit = 1.
//--------------------------------------------------------------------------------------------------

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::depth::MarketDepth;
use crate::types::{OrderId, OrderSide, OrderType, Quantity, Trade};

/// Errors produced while decoding a request line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line has no `|` separator between verb and payload.
    #[error("message has no '|' separator: {0:?}")]
    MissingSeparator(String),

    /// The verb before the separator is not recognised.
    #[error("unknown message verb: {0:?}")]
    UnknownVerb(String),

    /// The payload has the wrong number of comma-separated fields.
    #[error("{verb} expects {expected} payload fields, got {got}")]
    FieldCount {
        verb: &'static str,
        expected: usize,
        got: usize,
    },

    /// A payload field failed to parse.
    #[error("invalid {field}: {value:?}")]
    InvalidField {
        field: &'static str,
        value: String,
    },
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SubmitOrder {
        id: OrderId,
        symbol: String,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        quantity: Quantity,
    },
    CancelOrder {
        id: OrderId,
        symbol: String,
    },
    ModifyOrder {
        id: OrderId,
        symbol: String,
        new_price: Decimal,
        new_quantity: Quantity,
    },
    GetBestBid {
        symbol: String,
    },
    GetBestAsk {
        symbol: String,
    },
    GetSpread {
        symbol: String,
    },
    GetMarketDepth {
        symbol: String,
        levels: usize,
    },
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some((verb, payload)) = line.split_once('|') else {
            return Err(ProtocolError::MissingSeparator(line.to_string()));
        };
        match verb {
            "SUBMIT_ORDER" => {
                let fields = split_payload(payload, "SUBMIT_ORDER", 6)?;
                Ok(Request::SubmitOrder {
                    id: parse_field(fields[0], "order id")?,
                    symbol: fields[1].to_string(),
                    side: parse_side(fields[2])?,
                    order_type: parse_order_type(fields[3])?,
                    price: parse_field(fields[4], "price")?,
                    quantity: parse_field(fields[5], "quantity")?,
                })
            }
            "CANCEL_ORDER" => {
                let fields = split_payload(payload, "CANCEL_ORDER", 2)?;
                Ok(Request::CancelOrder {
                    id: parse_field(fields[0], "order id")?,
                    symbol: fields[1].to_string(),
                })
            }
            "MODIFY_ORDER" => {
                let fields = split_payload(payload, "MODIFY_ORDER", 4)?;
                Ok(Request::ModifyOrder {
                    id: parse_field(fields[0], "order id")?,
                    symbol: fields[1].to_string(),
                    new_price: parse_field(fields[2], "price")?,
                    new_quantity: parse_field(fields[3], "quantity")?,
                })
            }
            "GET_BEST_BID" => Ok(Request::GetBestBid {
                symbol: single_field(payload, "GET_BEST_BID")?,
            }),
            "GET_BEST_ASK" => Ok(Request::GetBestAsk {
                symbol: single_field(payload, "GET_BEST_ASK")?,
            }),
            "GET_SPREAD" => Ok(Request::GetSpread {
                symbol: single_field(payload, "GET_SPREAD")?,
            }),
            "GET_MARKET_DEPTH" => {
                let fields = split_payload(payload, "GET_MARKET_DEPTH", 2)?;
                Ok(Request::GetMarketDepth {
                    symbol: fields[0].to_string(),
                    levels: parse_field(fields[1], "levels")?,
                })
            }
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

impl Request {
    /// Renders the request in wire format (the inverse of parsing).
    pub fn to_wire(&self) -> String {
        match self {
            Request::SubmitOrder {
                id,
                symbol,
                side,
                order_type,
                price,
                quantity,
            } => format!(
                "SUBMIT_ORDER|{id},{symbol},{},{},{price},{quantity}",
                side.wire_code(),
                order_type.wire_code()
            ),
            Request::CancelOrder { id, symbol } => format!("CANCEL_ORDER|{id},{symbol}"),
            Request::ModifyOrder {
                id,
                symbol,
                new_price,
                new_quantity,
            } => format!("MODIFY_ORDER|{id},{symbol},{new_price},{new_quantity}"),
            Request::GetBestBid { symbol } => format!("GET_BEST_BID|{symbol}"),
            Request::GetBestAsk { symbol } => format!("GET_BEST_ASK|{symbol}"),
            Request::GetSpread { symbol } => format!("GET_SPREAD|{symbol}"),
            Request::GetMarketDepth { symbol, levels } => {
                format!("GET_MARKET_DEPTH|{symbol},{levels}")
            }
        }
    }
}

/// A response line sent back to the client.
#[derive(Debug, Clone)]
pub enum Response {
    /// One executed trade; emitted before the terminal `Accepted`.
    Trade(Trade),
    /// Submission processed; reports how many trades it produced.
    Accepted { order_id: OrderId, trade_count: usize },
    Cancelled { order_id: OrderId, ok: bool },
    Modified { order_id: OrderId, ok: bool },
    BestBid {
        symbol: String,
        price: Option<Decimal>,
    },
    BestAsk {
        symbol: String,
        price: Option<Decimal>,
    },
    Spread {
        symbol: String,
        spread: Option<Decimal>,
    },
    Depth(MarketDepth),
    Error { reason: String },
}

fn fmt_opt_price(price: &Option<Decimal>) -> String {
    match price {
        Some(value) => value.to_string(),
        None => "NONE".to_string(),
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Trade(trade) => write!(
                f,
                "TRADE|{},{},{},{},{}",
                trade.trade_id,
                trade.buy_order_id,
                trade.sell_order_id,
                trade.execution_price,
                trade.quantity
            ),
            Response::Accepted {
                order_id,
                trade_count,
            } => write!(f, "ACCEPTED|{order_id},{trade_count}"),
            Response::Cancelled { order_id, ok } => write!(f, "CANCELLED|{order_id},{ok}"),
            Response::Modified { order_id, ok } => write!(f, "MODIFIED|{order_id},{ok}"),
            Response::BestBid { symbol, price } => {
                write!(f, "BEST_BID|{symbol},{}", fmt_opt_price(price))
            }
            Response::BestAsk { symbol, price } => {
                write!(f, "BEST_ASK|{symbol},{}", fmt_opt_price(price))
            }
            Response::Spread { symbol, spread } => {
                write!(f, "SPREAD|{symbol},{}", fmt_opt_price(spread))
            }
            Response::Depth(depth) => match serde_json::to_string(depth) {
                Ok(json) => write!(f, "DEPTH|{json}"),
                Err(_) => write!(f, "ERROR|depth serialization failed"),
            },
            Response::Error { reason } => write!(f, "ERROR|{reason}"),
        }
    }
}

fn split_payload<'a>(
    payload: &'a str,
    verb: &'static str,
    expected: usize,
) -> Result<Vec<&'a str>, ProtocolError> {
    let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(ProtocolError::FieldCount {
            verb,
            expected,
            got: fields.len(),
        });
    }
    Ok(fields)
}

fn single_field(payload: &str, verb: &'static str) -> Result<String, ProtocolError> {
    let fields = split_payload(payload, verb, 1)?;
    Ok(fields[0].to_string())
}

fn parse_field<T: FromStr>(value: &str, field: &'static str) -> Result<T, ProtocolError> {
    value.parse::<T>().map_err(|_| ProtocolError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn parse_side(value: &str) -> Result<OrderSide, ProtocolError> {
    let code: u8 = parse_field(value, "side")?;
    OrderSide::from_wire_code(code).ok_or(ProtocolError::InvalidField {
        field: "side",
        value: value.to_string(),
    })
}

fn parse_order_type(value: &str) -> Result<OrderType, ProtocolError> {
    let code: u8 = parse_field(value, "order type")?;
    OrderType::from_wire_code(code).ok_or(ProtocolError::InvalidField {
        field: "order type",
        value: value.to_string(),
    })
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_submit_order() {
        let request: Request = "SUBMIT_ORDER|42,AAPL,0,1,150.25,100"
            .parse()
            .expect("valid line");
        assert_eq!(
            request,
            Request::SubmitOrder {
                id: 42,
                symbol: "AAPL".to_string(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                price: dec!(150.25),
                quantity: 100,
            }
        );
    }

    #[test]
    fn test_parse_market_submit() {
        let request: Request = "SUBMIT_ORDER|7,TSLA,1,0,0,50".parse().expect("valid line");
        assert_eq!(
            request,
            Request::SubmitOrder {
                id: 7,
                symbol: "TSLA".to_string(),
                side: OrderSide::Sell,
                order_type: OrderType::Market,
                price: dec!(0),
                quantity: 50,
            }
        );
    }

    #[test]
    fn test_parse_cancel_and_modify() {
        let cancel: Request = "CANCEL_ORDER|42,AAPL".parse().expect("valid line");
        assert_eq!(
            cancel,
            Request::CancelOrder {
                id: 42,
                symbol: "AAPL".to_string()
            }
        );

        let modify: Request = "MODIFY_ORDER|42,AAPL,151.00,25".parse().expect("valid line");
        assert_eq!(
            modify,
            Request::ModifyOrder {
                id: 42,
                symbol: "AAPL".to_string(),
                new_price: dec!(151.00),
                new_quantity: 25,
            }
        );
    }

    #[test]
    fn test_parse_market_data_requests() {
        assert_eq!(
            "GET_BEST_BID|AAPL".parse::<Request>().expect("valid"),
            Request::GetBestBid {
                symbol: "AAPL".to_string()
            }
        );
        assert_eq!(
            "GET_MARKET_DEPTH|AAPL,10".parse::<Request>().expect("valid"),
            Request::GetMarketDepth {
                symbol: "AAPL".to_string(),
                levels: 10
            }
        );
    }

    #[test]
    fn test_parse_tolerates_trailing_newline() {
        let request: Request = "GET_SPREAD|AAPL\r\n".parse().expect("valid line");
        assert_eq!(
            request,
            Request::GetSpread {
                symbol: "AAPL".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(matches!(
            "no separator here".parse::<Request>(),
            Err(ProtocolError::MissingSeparator(_))
        ));
        assert!(matches!(
            "NOT_A_VERB|1,2".parse::<Request>(),
            Err(ProtocolError::UnknownVerb(_))
        ));
        assert!(matches!(
            "SUBMIT_ORDER|1,AAPL,0,1,100".parse::<Request>(),
            Err(ProtocolError::FieldCount { expected: 6, .. })
        ));
        assert!(matches!(
            "SUBMIT_ORDER|abc,AAPL,0,1,100,10".parse::<Request>(),
            Err(ProtocolError::InvalidField { field: "order id", .. })
        ));
        assert!(matches!(
            "SUBMIT_ORDER|1,AAPL,5,1,100,10".parse::<Request>(),
            Err(ProtocolError::InvalidField { field: "side", .. })
        ));
    }

    #[test]
    fn test_request_wire_round_trip() {
        let requests = vec![
            Request::SubmitOrder {
                id: 1,
                symbol: "AAPL".to_string(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                price: dec!(100.50),
                quantity: 25,
            },
            Request::CancelOrder {
                id: 2,
                symbol: "TSLA".to_string(),
            },
            Request::GetMarketDepth {
                symbol: "GOOGL".to_string(),
                levels: 5,
            },
        ];
        for request in requests {
            let reparsed: Request = request.to_wire().parse().expect("round trip");
            assert_eq!(reparsed, request);
        }
    }

    #[test]
    fn test_response_formatting() {
        let trade = Trade::new(3, 1, 2, dec!(150.00), 60);
        assert_eq!(
            Response::Trade(trade).to_string(),
            "TRADE|3,1,2,150.00,60"
        );
        assert_eq!(
            Response::Accepted {
                order_id: 9,
                trade_count: 2
            }
            .to_string(),
            "ACCEPTED|9,2"
        );
        assert_eq!(
            Response::Cancelled {
                order_id: 9,
                ok: false
            }
            .to_string(),
            "CANCELLED|9,false"
        );
        assert_eq!(
            Response::BestBid {
                symbol: "AAPL".to_string(),
                price: Some(dec!(99.50))
            }
            .to_string(),
            "BEST_BID|AAPL,99.50"
        );
        assert_eq!(
            Response::Spread {
                symbol: "AAPL".to_string(),
                spread: None
            }
            .to_string(),
            "SPREAD|AAPL,NONE"
        );
        assert_eq!(
            Response::Error {
                reason: "engine is not running".to_string()
            }
            .to_string(),
            "ERROR|engine is not running"
        );
    }
}
