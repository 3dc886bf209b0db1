// tests/connector_flow.rs
//
// Walks one order through the whole connector: metadata load, signed
// placement, acknowledgement, push-stream fills and status updates, balance
// reconciliation, and market-data conversion.
use chainring_connector::domain::models::{
    FeeKind, MarketTrade, OrderBookSnapshot, OrderSide, OrderState, OrderType,
};
use chainring_connector::dto::{LimitEntry, NewOrderResponse, PushEvent, PushMessage, WireBalance};
use chainring_connector::metadata::{ExchangeMetadata, MetadataHandle};
use chainring_connector::reconcile::{BalanceReconciler, OrderLifecycleReconciler};
use chainring_connector::signing::{SigningEngine, Wallet};
use chrono::Utc;
use rust_decimal_macros::dec;

const TEST_SECRET_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn load_metadata() -> ExchangeMetadata {
    serde_json::from_value(serde_json::json!({
        "chains": [
            {
                "id": 1337,
                "name": "localhost",
                "contracts": [
                    {"name": "Exchange", "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3"}
                ],
                "symbols": [
                    {"name": "BTC:1337", "decimals": 18, "contractAddress": null},
                    {"name": "ETH:1337", "decimals": 18,
                     "contractAddress": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"}
                ]
            }
        ],
        "markets": [
            {
                "id": "BTC:1337/ETH:1337",
                "baseSymbol": "BTC:1337",
                "baseDecimals": 18,
                "quoteSymbol": "ETH:1337",
                "quoteDecimals": 18,
                "tickSize": "0.05",
                "lastPrice": "18.40"
            }
        ],
        "feeRates": {"maker": 100, "taker": 200}
    }))
    .unwrap()
}

fn push_event(raw: serde_json::Value) -> PushEvent {
    let PushMessage::Publish { data, .. } = serde_json::from_value(raw).unwrap();
    data
}

#[test]
fn order_placement_to_filled() {
    let metadata = load_metadata();
    assert!(metadata.is_valid());
    let handle = MetadataHandle::new(metadata);

    let engine = SigningEngine::new(Wallet::from_secret_key(TEST_SECRET_KEY).unwrap(), 1337);
    let request = engine
        .prepare_place_order(
            "cid-flow-1",
            "BTC:1337/ETH:1337",
            OrderSide::Buy,
            OrderType::Limit,
            dec!(1),
            Some(dec!(18.35)),
            &handle.snapshot(),
        )
        .unwrap();
    assert_eq!(request.amount.value, "1000000000000000000");
    assert_eq!(request.price.as_deref(), Some("18.35"));
    assert_eq!(request.nonce.len(), 32);
    // 65-byte signature, 0x-prefixed
    assert_eq!(request.signature.len(), 132);
    assert!(request.signature.starts_with("0x"));

    let mut tracker = OrderLifecycleReconciler::new(handle.clone());
    tracker
        .track_new(
            &request.client_order_id,
            &request.market_id,
            OrderSide::Buy,
            OrderType::Limit,
            dec!(1),
            Some(dec!(18.35)),
            &request.nonce,
        )
        .unwrap();
    assert_eq!(
        tracker.order("cid-flow-1").unwrap().state,
        OrderState::PendingCreate
    );

    let ack: NewOrderResponse = serde_json::from_value(serde_json::json!({
        "orderId": "ord_flow_1",
        "requestStatus": "Accepted"
    }))
    .unwrap();
    assert!(tracker.apply_placement_ack("cid-flow-1", &ack).unwrap().is_none());

    let created = push_event(serde_json::json!({
        "type": "Publish",
        "topic": {"type": "MyOrders"},
        "data": {
            "type": "MyOrderCreated",
            "order": {
                "id": "ord_flow_1",
                "status": "Open",
                "timing": {"createdAt": "2024-05-01T10:00:00Z"}
            }
        }
    }));
    let output = tracker.apply_push_event(&created).unwrap();
    assert_eq!(output.order_updates[0].state, OrderState::Open);

    // partial fill arrives on the trades channel
    let trade = push_event(serde_json::json!({
        "type": "Publish",
        "topic": {"type": "MyTrades"},
        "data": {
            "type": "MyTradesCreated",
            "trades": [{
                "id": "trade_flow_1",
                "orderId": "ord_flow_1",
                "amount": "500000000000000000",
                "price": "18.35",
                "feeAmount": "1835000000000000",
                "feeSymbol": "ETH:1337",
                "timestamp": "2024-05-01T10:00:05Z",
                "executionRole": "Maker"
            }]
        }
    }));
    let output = tracker.apply_push_event(&trade).unwrap();
    let fill = &output.fills[0].fill;
    assert_eq!(fill.amount, dec!(0.5));
    assert_eq!(fill.quote_amount, dec!(9.175));
    assert_eq!(fill.fee.asset, "ETH:1337");
    assert_eq!(fill.fee.kind, FeeKind::AddedToCost);
    assert!(!fill.is_taker);

    // the same trade redelivered by a REST poll changes nothing
    let output = tracker.apply_push_event(&trade).unwrap();
    assert!(output.fills.is_empty());

    let updated = push_event(serde_json::json!({
        "type": "Publish",
        "topic": {"type": "MyOrders"},
        "data": {
            "type": "MyOrderUpdated",
            "order": {
                "id": "ord_flow_1",
                "status": "Partial",
                "timing": {"createdAt": "2024-05-01T10:00:00Z",
                           "updatedAt": "2024-05-01T10:00:05Z"}
            }
        }
    }));
    let output = tracker.apply_push_event(&updated).unwrap();
    assert_eq!(output.order_updates[0].state, OrderState::PartiallyFilled);

    // remainder fills via the REST order detail
    let detail = serde_json::from_value(serde_json::json!({
        "id": "ord_flow_1",
        "status": "Filled",
        "timing": {"createdAt": "2024-05-01T10:00:00Z",
                   "closedAt": "2024-05-01T10:00:09Z"},
        "executions": [{
            "tradeId": "trade_flow_2",
            "amount": "500000000000000000",
            "price": "18.35",
            "feeAmount": "3670000000000000",
            "feeSymbol": "ETH:1337",
            "timestamp": "2024-05-01T10:00:09Z",
            "role": "Taker"
        }]
    }))
    .unwrap();
    let output = tracker.apply_rest_order_detail("cid-flow-1", &detail).unwrap();
    assert_eq!(output.fills.len(), 1);
    assert!(output.fills[0].fill.is_taker);
    assert_eq!(output.order_updates[0].state, OrderState::Filled);

    let order = tracker.order("cid-flow-1").unwrap();
    assert_eq!(order.executed_amount(), dec!(1));
    assert_eq!(order.fills.len(), 2);

    // stale Open after the fill is ignored
    let stale = push_event(serde_json::json!({
        "type": "Publish",
        "topic": {"type": "MyOrders"},
        "data": {
            "type": "MyOrderUpdated",
            "order": {
                "id": "ord_flow_1",
                "status": "Open",
                "timing": {"createdAt": "2024-05-01T10:00:00Z"}
            }
        }
    }));
    let output = tracker.apply_push_event(&stale).unwrap();
    assert!(output.order_updates.is_empty());

    let removed = tracker.remove_if_terminal("cid-flow-1").unwrap();
    assert_eq!(removed.state, OrderState::Filled);
    assert_eq!(tracker.active_orders().count(), 0);
}

#[test]
fn balances_follow_the_two_feeds() {
    let handle = MetadataHandle::new(load_metadata());
    let mut balances = BalanceReconciler::new(handle);

    let totals: Vec<WireBalance> = serde_json::from_value(serde_json::json!([
        {"symbol": "BTC:1337", "total": "15000000000000000000"},
        {"symbol": "ETH:1337", "total": "2000000000000000000000"}
    ]))
    .unwrap();
    balances.apply_total_balances(&totals).unwrap();
    assert_eq!(balances.entry("BTC:1337").unwrap().total, dec!(15));
    assert_eq!(balances.entry("ETH:1337").unwrap().total, dec!(2000));

    let limits: Vec<LimitEntry> = serde_json::from_value(serde_json::json!([
        {"marketId": "BTC:1337/ETH:1337",
         "base": "12000000000000000000", "quote": "1800000000000000000000"}
    ]))
    .unwrap();
    balances.apply_limits(&limits).unwrap();
    assert_eq!(balances.entry("BTC:1337").unwrap().available, dec!(12));
    assert_eq!(balances.entry("ETH:1337").unwrap().available, dec!(1800));

    // ETH disappears from the next totals snapshot: gone from both tables
    let totals: Vec<WireBalance> = serde_json::from_value(serde_json::json!([
        {"symbol": "BTC:1337", "total": "15000000000000000000"}
    ]))
    .unwrap();
    let records = balances.apply_total_balances(&totals).unwrap();
    assert!(records
        .iter()
        .any(|r| r.asset == "ETH:1337" && r.entry.is_none()));
    assert!(balances.entry("ETH:1337").is_none());
    assert_eq!(balances.entry("BTC:1337").unwrap().available, dec!(12));
}

#[test]
fn market_data_converts_from_push_payloads() {
    let event = push_event(serde_json::json!({
        "type": "Publish",
        "topic": {"type": "OrderBook", "marketId": "BTC:1337/ETH:1337"},
        "data": {
            "type": "OrderBook",
            "marketId": "BTC:1337/ETH:1337",
            "buy": [{"price": "18.35", "size": "0.05668836"},
                    {"price": "18.30", "size": "0.50000000"}],
            "sell": [{"price": "18.45", "size": "0.24215049"}]
        }
    }));
    let PushEvent::OrderBook(wire) = event else {
        panic!("expected an order book event");
    };
    let snapshot = OrderBookSnapshot::from_wire("BTC:1337/ETH:1337", &wire, Utc::now());
    assert_eq!(snapshot.best_bid().unwrap().price, dec!(18.35));
    assert_eq!(snapshot.best_ask().unwrap().price, dec!(18.45));
    assert_eq!(snapshot.bids.len(), 2);

    let event = push_event(serde_json::json!({
        "type": "Publish",
        "topic": {"type": "MarketTrades", "marketId": "BTC:1337/ETH:1337"},
        "data": {
            "type": "MarketTrades",
            "marketId": "BTC:1337/ETH:1337",
            "trades": [[41, "Sell", "0.1", "18.40", 1714557600.5]]
        }
    }));
    let PushEvent::MarketTrades { market_id, trades } = event else {
        panic!("expected a market trades event");
    };
    let trade = MarketTrade::from_wire(&market_id, &trades[0]);
    assert_eq!(trade.trade_id, 41);
    assert_eq!(trade.side, OrderSide::Sell);
    assert_eq!(trade.price, dec!(18.40));
}
