// Order execution and market data module
//
// The traits here are the only doors between the pure trading session and
// the outside world. Live trading plugs in the brokerage client, dry runs
// plug in the paper broker and a synthetic feed.
pub mod paper;
pub mod position_manager;
pub mod price_feed;

pub use paper::PaperBroker;
pub use position_manager::{
    decide, FillError, FillOutcome, OpenPosition, Position, PositionManager, PositionState,
};
pub use price_feed::{ReplayFeed, SyntheticFeed};

use crate::models::{Fill, OrderIntent, PriceTick};
use async_trait::async_trait;
use uuid::Uuid;

/// Market data could not be produced this time. The loop skips the tick.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketDataError {
    #[error("market data unavailable: {0}")]
    Unavailable(String),
    #[error("malformed market data: {0}")]
    Malformed(String),
    #[error("market data feed exhausted")]
    Exhausted,
}

/// Order did not produce a confirmed fill. Session state must stay untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("order {order_id} ended in state '{state}'")]
    NotFilled { order_id: Uuid, state: String },
    #[error("order {0} not confirmed before timeout")]
    Timeout(Uuid),
}

/// Source of price ticks for one pair
#[async_trait]
pub trait MarketData: Send {
    async fn latest_tick(&mut self) -> Result<PriceTick, MarketDataError>;
}

/// Order sink plus funds source
#[async_trait]
pub trait Brokerage: Send {
    /// Quote currency available for new entries
    async fn available_funds(&mut self) -> anyhow::Result<f64>;

    /// Execute an intent and wait for its confirmed fill
    ///
    /// A fill may cover less than `intent.quantity`. An error means nothing filled.
    async fn execute(&mut self, intent: &OrderIntent) -> Result<Fill, ExecutionError>;
}
