// src/reconcile/orders.rs
//
// Per-order state reconciliation. REST polling and the push stream report
// overlapping, sometimes out-of-order information about the same orders;
// updates are applied last-write-wins per order id, with two guards: terminal
// states are immutable and executions are idempotent per trade id.
use crate::config::{ERROR_REASON_ORDER_NOT_FOUND, ERROR_REASON_REJECTED_BY_SEQUENCER,
    REQUEST_STATUS_REJECTED};
use crate::domain::errors::{ReconcileError, ReconcileResult};
use crate::domain::models::{
    FeeKind, Fill, OrderSide, OrderState, OrderType, TradeFee, TrackedOrder,
};
use crate::dto::{
    ApiErrorBody, ExecutionRole, NewOrderResponse, PushEvent, WireExecution, WireOrder,
};
use crate::metadata::{ExchangeMetadata, MetadataHandle};
use crate::precision;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Classification of a structured exchange error, deciding how the external
/// tracker should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The exchange no longer knows the order; escalate as lost rather than
    /// retrying the status poll.
    LostOrder,
    /// The sequencer refused the cancel, meaning the order is already done;
    /// treat the cancellation as resolved.
    CancelAlreadyResolved,
    /// Opaque failure, left to the external retry policy.
    Other,
}

/// State change emitted towards the external order tracker.
#[derive(Debug, Clone)]
pub struct OrderUpdateRecord {
    pub client_order_id: String,
    pub exchange_order_id: Option<String>,
    pub state: OrderState,
    pub timestamp: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

/// Newly applied execution emitted towards the external order tracker.
#[derive(Debug, Clone)]
pub struct FillRecord {
    pub client_order_id: String,
    pub exchange_order_id: Option<String>,
    pub fill: Fill,
}

/// Batch of updates produced by one push event.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutput {
    pub order_updates: Vec<OrderUpdateRecord>,
    pub fills: Vec<FillRecord>,
}

pub struct OrderLifecycleReconciler {
    metadata: MetadataHandle,
    /// Tracked orders by client order id
    orders: HashMap<String, TrackedOrder>,
    /// Exchange order id -> client order id
    client_id_by_exchange_id: HashMap<String, String>,
}

impl OrderLifecycleReconciler {
    pub fn new(metadata: MetadataHandle) -> Self {
        Self {
            metadata,
            orders: HashMap::new(),
            client_id_by_exchange_id: HashMap::new(),
        }
    }

    /// Starts tracking a freshly placed order in PendingCreate.
    pub fn track_new(
        &mut self,
        client_order_id: &str,
        market_id: &str,
        side: OrderSide,
        order_type: OrderType,
        amount: Decimal,
        price: Option<Decimal>,
        nonce: &str,
    ) -> ReconcileResult<()> {
        if self.orders.contains_key(client_order_id) {
            return Err(ReconcileError::DuplicateClientOrderId(
                client_order_id.to_string(),
            ));
        }
        self.orders.insert(
            client_order_id.to_string(),
            TrackedOrder::new(client_order_id, market_id, side, order_type, amount, price, nonce),
        );
        Ok(())
    }

    /// Applies the placement acknowledgement. A "Rejected" request status is
    /// a hard rejection: the order becomes terminal and is never tracked as
    /// open. Otherwise the exchange order id is recorded (at most once).
    pub fn apply_placement_ack(
        &mut self,
        client_order_id: &str,
        response: &NewOrderResponse,
    ) -> ReconcileResult<Option<OrderUpdateRecord>> {
        let order = self
            .orders
            .get_mut(client_order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(client_order_id.to_string()))?;

        if response.request_status.as_deref() == Some(REQUEST_STATUS_REJECTED) {
            order.state = OrderState::Rejected;
            order.failure_reason = Some(
                response
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Order rejected".to_string()),
            );
            log::warn!(
                "Order {} rejected by the exchange: {:?}",
                client_order_id,
                order.failure_reason
            );
            return Ok(Some(record_for(order)));
        }

        if let Some(exchange_order_id) = &response.order_id {
            self.assign_exchange_order_id(client_order_id, exchange_order_id)?;
        }
        Ok(None)
    }

    fn assign_exchange_order_id(
        &mut self,
        client_order_id: &str,
        exchange_order_id: &str,
    ) -> ReconcileResult<()> {
        if let Some(existing) = self.client_id_by_exchange_id.get(exchange_order_id) {
            if existing != client_order_id {
                return Err(ReconcileError::DuplicateExchangeOrderId {
                    exchange_order_id: exchange_order_id.to_string(),
                    client_order_id: existing.clone(),
                });
            }
            return Ok(());
        }

        let order = self
            .orders
            .get_mut(client_order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(client_order_id.to_string()))?;
        order.exchange_order_id = Some(exchange_order_id.to_string());
        self.client_id_by_exchange_id
            .insert(exchange_order_id.to_string(), client_order_id.to_string());
        Ok(())
    }

    /// Applies a status update from the REST order detail for a known client
    /// order id. Also learns the exchange order id when it was lost (e.g.
    /// the placement acknowledgement never arrived).
    pub fn apply_order_update_for(
        &mut self,
        client_order_id: &str,
        wire: &WireOrder,
    ) -> ReconcileResult<Option<OrderUpdateRecord>> {
        if !self.orders.contains_key(client_order_id) {
            return Err(ReconcileError::UnknownOrder(client_order_id.to_string()));
        }
        self.assign_exchange_order_id(client_order_id, &wire.id)?;
        self.transition(client_order_id, wire)
    }

    /// Applies a status update arriving on the push stream, resolved through
    /// the exchange order id. Updates for orders this tracker does not know
    /// are skipped.
    pub fn apply_order_update(
        &mut self,
        wire: &WireOrder,
    ) -> ReconcileResult<Option<OrderUpdateRecord>> {
        let Some(client_order_id) = self.client_id_by_exchange_id.get(&wire.id).cloned() else {
            log::debug!("Skipping update for untracked exchange order {}", wire.id);
            return Ok(None);
        };
        self.transition(&client_order_id, wire)
    }

    fn transition(
        &mut self,
        client_order_id: &str,
        wire: &WireOrder,
    ) -> ReconcileResult<Option<OrderUpdateRecord>> {
        let new_state = OrderState::from_wire(&wire.status)
            .ok_or_else(|| ReconcileError::UnknownStatus(wire.status.clone()))?;

        let order = self
            .orders
            .get_mut(client_order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(client_order_id.to_string()))?;

        if order.state.is_terminal() {
            log::debug!(
                "Ignoring {} update for order {} already terminal in {}",
                wire.status,
                client_order_id,
                order.state
            );
            return Ok(None);
        }

        // Last-write-wins: there is no sequence number to order the REST and
        // push channels against each other.
        order.state = new_state;
        order.updated_at = wire.timing.effective();
        Ok(Some(record_for(order)))
    }

    /// Applies one execution to an order, at most once per trade id.
    /// Duplicate deliveries across the REST and push channels are dropped.
    pub fn apply_execution(
        &mut self,
        client_order_id: &str,
        execution: &WireExecution,
    ) -> ReconcileResult<Option<FillRecord>> {
        let metadata = self.metadata.snapshot();
        let order = self
            .orders
            .get(client_order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(client_order_id.to_string()))?;
        let Some(fill) = decode_fill(order, &metadata, execution)? else {
            return Ok(None);
        };
        Ok(Some(self.commit_fill(client_order_id, fill)?))
    }

    fn commit_fill(&mut self, client_order_id: &str, fill: Fill) -> ReconcileResult<FillRecord> {
        let order = self
            .orders
            .get_mut(client_order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(client_order_id.to_string()))?;
        order.fills.push(fill.clone());
        Ok(FillRecord {
            client_order_id: client_order_id.to_string(),
            exchange_order_id: order.exchange_order_id.clone(),
            fill,
        })
    }

    /// Applies a full REST order detail: executions first, then the status,
    /// so a Filled state never precedes its fills. The whole detail is
    /// decoded before anything is committed; a detail carrying an
    /// unrecognized status or an undecodable execution changes nothing, so
    /// its fills are still new on the next poll.
    pub fn apply_rest_order_detail(
        &mut self,
        client_order_id: &str,
        wire: &WireOrder,
    ) -> ReconcileResult<ReconcileOutput> {
        if OrderState::from_wire(&wire.status).is_none() {
            return Err(ReconcileError::UnknownStatus(wire.status.clone()));
        }
        self.assign_exchange_order_id(client_order_id, &wire.id)?;

        let metadata = self.metadata.snapshot();
        let order = self
            .orders
            .get(client_order_id)
            .ok_or_else(|| ReconcileError::UnknownOrder(client_order_id.to_string()))?;
        let mut fills: Vec<Fill> = Vec::new();
        for execution in &wire.executions {
            if fills.iter().any(|f| f.trade_id == execution.trade_id) {
                continue;
            }
            if let Some(fill) = decode_fill(order, &metadata, execution)? {
                fills.push(fill);
            }
        }

        let mut output = ReconcileOutput::default();
        for fill in fills {
            output.fills.push(self.commit_fill(client_order_id, fill)?);
        }
        if let Some(record) = self.transition(client_order_id, wire)? {
            output.order_updates.push(record);
        }
        Ok(output)
    }

    /// Routes a decoded push event into the tracker. Balance and market-data
    /// events are not order state and pass through untouched.
    pub fn apply_push_event(&mut self, event: &PushEvent) -> ReconcileResult<ReconcileOutput> {
        let mut output = ReconcileOutput::default();
        match event {
            PushEvent::MyOrderCreated { order } | PushEvent::MyOrderUpdated { order } => {
                if let Some(record) = self.apply_order_update(order)? {
                    output.order_updates.push(record);
                }
            }
            // Bulk payloads are applied entry by entry: one undecodable
            // entry is skipped with a warning, it does not abort the batch
            // and does not drop what was already applied.
            PushEvent::MyOrders { orders } => {
                for order in orders {
                    match self.apply_order_update(order) {
                        Ok(Some(record)) => output.order_updates.push(record),
                        Ok(None) => {}
                        Err(e) => {
                            log::warn!("Skipping update for order {}: {}", order.id, e);
                        }
                    }
                }
            }
            PushEvent::MyTradesCreated { trades } | PushEvent::MyTrades { trades } => {
                for trade in trades {
                    let Some(exchange_order_id) = &trade.order_id else {
                        log::debug!("Skipping trade {} without an order id", trade.trade_id);
                        continue;
                    };
                    let Some(client_order_id) =
                        self.client_id_by_exchange_id.get(exchange_order_id).cloned()
                    else {
                        log::debug!(
                            "Skipping trade {} for untracked exchange order {}",
                            trade.trade_id,
                            exchange_order_id
                        );
                        continue;
                    };
                    match self.apply_execution(&client_order_id, trade) {
                        Ok(Some(record)) => output.fills.push(record),
                        Ok(None) => {}
                        Err(e) => {
                            log::warn!(
                                "Skipping trade {} for order {}: {}",
                                trade.trade_id,
                                client_order_id,
                                e
                            );
                        }
                    }
                }
            }
            PushEvent::Balances { .. }
            | PushEvent::Limits { .. }
            | PushEvent::OrderBook(_)
            | PushEvent::MarketTrades { .. } => {}
            PushEvent::Unknown => {
                log::debug!("Ignoring unhandled push event kind");
            }
        }
        Ok(output)
    }

    /// Decides how a structured exchange error should be handled.
    pub fn classify_api_error(body: &ApiErrorBody) -> ApiErrorKind {
        if body
            .errors
            .iter()
            .any(|e| e.reason == ERROR_REASON_ORDER_NOT_FOUND)
        {
            ApiErrorKind::LostOrder
        } else if body
            .errors
            .iter()
            .any(|e| e.reason == ERROR_REASON_REJECTED_BY_SEQUENCER)
        {
            ApiErrorKind::CancelAlreadyResolved
        } else {
            ApiErrorKind::Other
        }
    }

    pub fn order(&self, client_order_id: &str) -> Option<&TrackedOrder> {
        self.orders.get(client_order_id)
    }

    pub fn order_by_exchange_id(&self, exchange_order_id: &str) -> Option<&TrackedOrder> {
        self.client_id_by_exchange_id
            .get(exchange_order_id)
            .and_then(|client_order_id| self.orders.get(client_order_id))
    }

    pub fn active_orders(&self) -> impl Iterator<Item = &TrackedOrder> {
        self.orders.values().filter(|o| !o.state.is_terminal())
    }

    /// Removes an order from tracking once it has reached a terminal state
    /// and its confirmations have been drained.
    pub fn remove_if_terminal(&mut self, client_order_id: &str) -> Option<TrackedOrder> {
        let terminal = self
            .orders
            .get(client_order_id)
            .map(|o| o.state.is_terminal())
            .unwrap_or(false);
        if !terminal {
            return None;
        }
        let order = self.orders.remove(client_order_id)?;
        if let Some(exchange_order_id) = &order.exchange_order_id {
            self.client_id_by_exchange_id.remove(exchange_order_id);
        }
        Some(order)
    }
}

/// Decodes an execution against the order's market without mutating the
/// order. Returns `None` for a trade id the order has already absorbed.
fn decode_fill(
    order: &TrackedOrder,
    metadata: &ExchangeMetadata,
    execution: &WireExecution,
) -> ReconcileResult<Option<Fill>> {
    if order.has_fill(&execution.trade_id) {
        log::debug!(
            "Dropping duplicate trade {} for order {}",
            execution.trade_id,
            order.client_order_id
        );
        return Ok(None);
    }

    let market = metadata.market(&order.market_id)?;
    let amount = precision::decimal_from_wire(&execution.amount, market.base_decimals)?;
    let price = execution.price;

    // The fee is reported in quote units when its symbol matches the
    // market's quote symbol, otherwise in base units.
    let (fee_asset, fee_decimals) = if execution.fee_symbol == market.quote_symbol {
        (market.quote_symbol.clone(), market.quote_decimals)
    } else {
        (market.base_symbol.clone(), market.base_decimals)
    };
    let fee_amount = precision::decimal_from_wire(&execution.fee_amount, fee_decimals)?;
    let fee_kind = match order.side {
        OrderSide::Buy => FeeKind::AddedToCost,
        OrderSide::Sell => FeeKind::DeductedFromReturns,
    };

    Ok(Some(Fill {
        trade_id: execution.trade_id.clone(),
        is_taker: execution.role == ExecutionRole::Taker,
        amount,
        quote_amount: amount * price,
        price,
        fee: TradeFee {
            asset: fee_asset,
            amount: fee_amount,
            kind: fee_kind,
        },
        timestamp: execution.timestamp,
    }))
}

fn record_for(order: &TrackedOrder) -> OrderUpdateRecord {
    OrderUpdateRecord {
        client_order_id: order.client_order_id.clone(),
        exchange_order_id: order.exchange_order_id.clone(),
        state: order.state,
        timestamp: order.updated_at,
        reason: order.failure_reason.clone(),
    }
}
