use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single price observation for the traded pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceTick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PriceTick {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Direction of a fused trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Hold => write!(f, "HOLD"),
        }
    }
}

/// Fused trading signal
///
/// Built fresh on every evaluation. `strength` is the share of ready
/// indicators that agree with `direction` (0.0 for HOLD).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub strength: f64,
    pub reasons: Vec<String>,
}

impl Signal {
    pub fn hold(reasons: Vec<String>) -> Self {
        Self {
            direction: Direction::Hold,
            strength: 0.0,
            reasons,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.direction == Direction::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.direction == Direction::Sell
    }
}

/// Side of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderAction::Buy => write!(f, "buy"),
            OrderAction::Sell => write!(f, "sell"),
        }
    }
}

/// Why an order was proposed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntentReason {
    Entry,
    StopLoss,
    TakeProfit,
    SignalReversal,
}

impl fmt::Display for IntentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IntentReason::Entry => "signal entry",
            IntentReason::StopLoss => "stop-loss",
            IntentReason::TakeProfit => "take-profit",
            IntentReason::SignalReversal => "signal reversal",
        };
        f.write_str(text)
    }
}

/// Proposed order, not yet executed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderIntent {
    pub client_order_id: Uuid,
    pub action: OrderAction,
    pub quantity: f64,
    pub reference_price: f64,
    pub reason: IntentReason,
}

impl OrderIntent {
    pub fn new(action: OrderAction, quantity: f64, reference_price: f64, reason: IntentReason) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            action,
            quantity,
            reference_price,
            reason,
        }
    }
}

/// Confirmed execution report for an intent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fill {
    pub order_id: Uuid,
    pub action: OrderAction,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
}

/// Closed round trip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub exit_reason: IntentReason,
}

impl TradeRecord {
    pub fn new(
        entry_price: f64,
        exit_price: f64,
        quantity: f64,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        exit_reason: IntentReason,
    ) -> Self {
        let pnl = (exit_price - entry_price) * quantity;
        let pnl_pct = ((exit_price - entry_price) / entry_price) * 100.0;

        Self {
            entry_price,
            exit_price,
            quantity,
            entry_time,
            exit_time,
            pnl,
            pnl_pct,
            exit_reason,
        }
    }

    pub fn holding_period_minutes(&self) -> i64 {
        (self.exit_time - self.entry_time).num_minutes()
    }
}
