use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

use crate::models::{Fill, IntentReason, OrderAction, OrderIntent, Signal, TradeRecord};
use crate::risk::{RiskLimits, SizingError};

/// Fill ids remembered for duplicate detection
const APPLIED_FILL_MEMORY: usize = 64;

/// Relative slack when comparing fill and position quantities
const QUANTITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long,
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::Long => write!(f, "LONG"),
        }
    }
}

/// An open long position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_loss_price: f64,   // entry * (1 - stop_loss_pct)
    pub take_profit_price: f64, // entry * (1 + profit_target_pct)
}

impl OpenPosition {
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.quantity
    }
}

/// Position for one trading pair. Quantity exists only while long.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Flat,
    Long(OpenPosition),
}

impl Position {
    pub fn state(&self) -> PositionState {
        match self {
            Position::Flat => PositionState::Flat,
            Position::Long(_) => PositionState::Long,
        }
    }

    pub fn quantity(&self) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long(open) => open.quantity,
        }
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            Position::Flat => None,
            Position::Long(open) => Some(open),
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long(_))
    }
}

/// Result of applying a confirmed fill
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Opened(OpenPosition),
    Closed(TradeRecord),
    /// Partial SELL fill: the filled part is booked, the rest stays open
    Reduced {
        trade: TradeRecord,
        remaining: OpenPosition,
    },
    /// Fill was already applied; nothing changed
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FillError {
    #[error("cannot apply a {action} fill while {state}")]
    InvalidTransition {
        state: PositionState,
        action: OrderAction,
    },
    #[error("fill {got} does not belong to order {expected}")]
    Mismatch { expected: Uuid, got: Uuid },
    #[error("invalid fill: price {price}, quantity {quantity}")]
    InvalidFill { price: f64, quantity: f64 },
}

/// Map a signal and the current position to an order intent (or none)
///
/// Exits are checked in this order while long: stop-loss, take-profit,
/// then signal reversal. Risk exits ignore the signal entirely.
///
/// # Arguments
/// * `limits` - Risk envelope (thresholds, exit levels, max size)
/// * `signal` - Fused signal for the current tick
/// * `position` - Current position for the pair
/// * `current_price` - Latest price
/// * `available_funds` - Quote currency available for an entry
pub fn decide(
    limits: &RiskLimits,
    signal: &Signal,
    position: &Position,
    current_price: f64,
    available_funds: f64,
) -> Result<Option<OrderIntent>, SizingError> {
    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(SizingError::InvalidPrice(current_price));
    }

    match position {
        Position::Flat => {
            if signal.is_buy() && signal.strength >= limits.entry_threshold {
                let quantity = limits.size_order(current_price, available_funds)?;
                return Ok(Some(OrderIntent::new(
                    OrderAction::Buy,
                    quantity,
                    current_price,
                    IntentReason::Entry,
                )));
            }
            Ok(None)
        }
        Position::Long(open) => {
            let reason = if current_price <= open.stop_loss_price {
                Some(IntentReason::StopLoss)
            } else if current_price >= open.take_profit_price {
                Some(IntentReason::TakeProfit)
            } else if signal.is_sell() && signal.strength >= limits.exit_threshold {
                Some(IntentReason::SignalReversal)
            } else {
                None
            };

            Ok(reason.map(|reason| {
                OrderIntent::new(OrderAction::Sell, open.quantity, current_price, reason)
            }))
        }
    }
}

/// Owns the position for one pair and mutates it on confirmed fills only
#[derive(Debug, Clone)]
pub struct PositionManager {
    limits: RiskLimits,
    position: Position,
    applied_fills: VecDeque<Uuid>,
}

impl PositionManager {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            position: Position::Flat,
            applied_fills: VecDeque::with_capacity(APPLIED_FILL_MEMORY),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Propose an order for the current position. Never changes state.
    pub fn decide(
        &self,
        signal: &Signal,
        current_price: f64,
        available_funds: f64,
    ) -> Result<Option<OrderIntent>, SizingError> {
        decide(
            &self.limits,
            signal,
            &self.position,
            current_price,
            available_funds,
        )
    }

    /// Apply the confirmed fill for `intent`
    ///
    /// FLAT + BUY opens a position with the filled quantity. LONG + SELL
    /// closes it, or reduces it when the fill covers only part of the
    /// position. Every other combination is rejected without touching state.
    pub fn apply_fill(
        &mut self,
        intent: &OrderIntent,
        fill: &Fill,
    ) -> Result<FillOutcome, FillError> {
        if self.applied_fills.contains(&fill.order_id) {
            tracing::warn!("Ignoring duplicate fill for order {}", fill.order_id);
            return Ok(FillOutcome::Duplicate);
        }
        if fill.order_id != intent.client_order_id {
            return Err(FillError::Mismatch {
                expected: intent.client_order_id,
                got: fill.order_id,
            });
        }
        if !(fill.price.is_finite() && fill.price > 0.0)
            || !(fill.quantity.is_finite() && fill.quantity > 0.0)
        {
            return Err(FillError::InvalidFill {
                price: fill.price,
                quantity: fill.quantity,
            });
        }

        let outcome = match (&self.position, fill.action) {
            (Position::Flat, OrderAction::Buy) => {
                let open = OpenPosition {
                    quantity: fill.quantity,
                    entry_price: fill.price,
                    entry_time: fill.timestamp,
                    stop_loss_price: self.limits.stop_loss_price(fill.price),
                    take_profit_price: self.limits.take_profit_price(fill.price),
                };
                self.position = Position::Long(open.clone());
                FillOutcome::Opened(open)
            }
            (Position::Long(open), OrderAction::Sell) => {
                let tolerance = QUANTITY_TOLERANCE * open.quantity.max(1.0);
                if fill.quantity < open.quantity - tolerance {
                    let trade = TradeRecord::new(
                        open.entry_price,
                        fill.price,
                        fill.quantity,
                        open.entry_time,
                        fill.timestamp,
                        intent.reason,
                    );
                    let remaining = OpenPosition {
                        quantity: open.quantity - fill.quantity,
                        ..open.clone()
                    };
                    tracing::warn!(
                        "Partial sell fill {:.8} of {:.8}, {:.8} still open",
                        fill.quantity,
                        open.quantity,
                        remaining.quantity
                    );
                    self.position = Position::Long(remaining.clone());
                    FillOutcome::Reduced { trade, remaining }
                } else {
                    if fill.quantity > open.quantity + tolerance {
                        tracing::warn!(
                            "Sell fill quantity {:.8} exceeds position {:.8}, booking the position size",
                            fill.quantity,
                            open.quantity
                        );
                    }
                    let trade = TradeRecord::new(
                        open.entry_price,
                        fill.price,
                        open.quantity,
                        open.entry_time,
                        fill.timestamp,
                        intent.reason,
                    );
                    self.position = Position::Flat;
                    FillOutcome::Closed(trade)
                }
            }
            (position, action) => {
                return Err(FillError::InvalidTransition {
                    state: position.state(),
                    action,
                });
            }
        };

        if self.applied_fills.len() == APPLIED_FILL_MEMORY {
            self.applied_fills.pop_front();
        }
        self.applied_fills.push_back(fill.order_id);

        Ok(outcome)
    }

    /// Mark-to-market P&L of the open position
    pub fn unrealized_pnl(&self, current_price: f64) -> Option<f64> {
        self.position
            .open()
            .map(|open| open.unrealized_pnl(current_price))
    }
}
