use crate::config::AppConfig;
use crate::execution::{FillError, FillOutcome, Position, PositionManager};
use crate::indicators::{IndicatorBank, IndicatorSnapshot, TickError};
use crate::models::{Fill, OrderIntent, PriceTick, Signal};
use crate::performance::{PerformanceSummary, PerformanceTracker};
use crate::risk::{RiskLimits, SizingError};
use crate::strategy::SignalFuser;

/// Everything decided for one accepted tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub snapshot: IndicatorSnapshot,
    pub signal: Signal,
    pub intent: Option<OrderIntent>,
    pub sizing_error: Option<SizingError>,
}

/// One trading pair's complete decision state, with no I/O
///
/// Owns its indicator bank, position and trade log. Independent sessions
/// share nothing, so several pairs can run side by side.
#[derive(Debug, Clone)]
pub struct TradingSession {
    symbol: String,
    bank: IndicatorBank,
    fuser: SignalFuser,
    positions: PositionManager,
    performance: PerformanceTracker,
}

impl TradingSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            symbol: config.run.symbol.clone(),
            bank: IndicatorBank::new(&config.indicators),
            fuser: SignalFuser::new(config.fusion.clone()),
            positions: PositionManager::new(RiskLimits::from(&config.risk)),
            performance: PerformanceTracker::new(),
        }
    }

    /// Feed a tick through indicators, fusion and the position manager
    ///
    /// A rejected tick returns the error and leaves every component as it was.
    pub fn on_tick(
        &mut self,
        tick: PriceTick,
        available_funds: f64,
    ) -> Result<TickReport, TickError> {
        let snapshot = self.bank.update(tick)?;
        self.performance.observe_price(tick);

        let signal = self.fuser.evaluate(&snapshot);
        let (intent, sizing_error) =
            match self.positions.decide(&signal, snapshot.price, available_funds) {
                Ok(intent) => (intent, None),
                Err(e) => (None, Some(e)),
            };

        Ok(TickReport {
            snapshot,
            signal,
            intent,
            sizing_error,
        })
    }

    /// Apply a confirmed fill; closed and partially closed trades go to the performance log
    pub fn on_fill(&mut self, intent: &OrderIntent, fill: &Fill) -> Result<FillOutcome, FillError> {
        let outcome = self.positions.apply_fill(intent, fill)?;
        match &outcome {
            FillOutcome::Closed(trade) | FillOutcome::Reduced { trade, .. } => {
                self.performance.record_trade(trade.clone());
            }
            FillOutcome::Opened(_) | FillOutcome::Duplicate => {}
        }
        Ok(outcome)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn position(&self) -> &Position {
        self.positions.position()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.bank.last_tick().map(|t| t.price)
    }

    pub fn unrealized_pnl(&self) -> Option<f64> {
        self.positions.unrealized_pnl(self.last_price()?)
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    pub fn summary(&self) -> PerformanceSummary {
        self.performance.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::PositionState;
    use crate::models::{Direction, IntentReason, OrderAction};
    use chrono::{Duration, Utc};

    fn tick(i: i64, price: f64) -> PriceTick {
        PriceTick::new(Utc::now() + Duration::seconds(30 * i), price)
    }

    fn fill(intent: &OrderIntent) -> Fill {
        Fill {
            order_id: intent.client_order_id,
            action: intent.action,
            price: intent.reference_price,
            quantity: intent.quantity,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_flat_market_holds() {
        let mut session = TradingSession::new(&AppConfig::default());
        let start = Utc::now();
        let mut last = None;
        for i in 0..30 {
            let t = PriceTick::new(start + Duration::seconds(30 * i), 100.0);
            last = Some(session.on_tick(t, 1_000.0).unwrap());
        }
        let report = last.unwrap();

        assert_eq!(report.snapshot.rsi, Some(50.0));
        assert_eq!(report.signal.direction, Direction::Hold);
        assert!(report.intent.is_none());
        assert_eq!(session.position().state(), PositionState::Flat);
    }

    #[test]
    fn test_rejected_tick_changes_nothing() {
        let mut session = TradingSession::new(&AppConfig::default());
        let t = tick(0, 100.0);
        session.on_tick(t, 1_000.0).unwrap();

        assert!(session.on_tick(t, 1_000.0).is_err());
        assert!(session.on_tick(tick(1, f64::NAN), 1_000.0).is_err());
        assert_eq!(session.last_price(), Some(100.0));
        assert_eq!(session.performance().buy_and_hold_pct(), Some(0.0));
    }

    #[test]
    fn test_fill_round_trip_records_trade() {
        let mut session = TradingSession::new(&AppConfig::default());
        session.on_tick(tick(0, 100.0), 1_000.0).unwrap();

        let buy = OrderIntent::new(OrderAction::Buy, 2.0, 100.0, IntentReason::Entry);
        session.on_fill(&buy, &fill(&buy)).unwrap();
        assert!(session.position().is_long());

        // below the 98.0 stop
        let report = session.on_tick(tick(1, 97.9), 0.0).unwrap();
        let sell = report.intent.unwrap();
        assert_eq!(sell.reason, IntentReason::StopLoss);
        assert!((session.unrealized_pnl().unwrap() + 4.2).abs() < 1e-9);

        let outcome = session.on_fill(&sell, &fill(&sell)).unwrap();
        assert!(matches!(outcome, FillOutcome::Closed(_)));
        assert_eq!(session.position().state(), PositionState::Flat);

        let summary = session.summary();
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.losses, 1);
    }

    #[test]
    fn test_partial_exit_books_filled_part() {
        let mut session = TradingSession::new(&AppConfig::default());
        session.on_tick(tick(0, 100.0), 1_000.0).unwrap();

        let buy = OrderIntent::new(OrderAction::Buy, 10.0, 100.0, IntentReason::Entry);
        session.on_fill(&buy, &fill(&buy)).unwrap();

        let sell = session.on_tick(tick(1, 97.9), 0.0).unwrap().intent.unwrap();
        let mut partial = fill(&sell);
        partial.quantity = 4.0;
        let outcome = session.on_fill(&sell, &partial).unwrap();

        assert!(matches!(outcome, FillOutcome::Reduced { .. }));
        assert!((session.position().quantity() - 6.0).abs() < 1e-9);
        assert_eq!(session.summary().total_trades, 1);
        assert!((session.performance().trades()[0].pnl + 8.4).abs() < 1e-9);
    }
}
