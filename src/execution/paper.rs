use super::{Brokerage, ExecutionError};
use crate::models::{Fill, OrderAction, OrderIntent};
use async_trait::async_trait;
use chrono::Utc;

/// Tolerance for cash/holdings comparisons
const EPSILON: f64 = 1e-9;

/// Simulated broker for `simulation_mode`
///
/// Fills every order instantly at the intent's reference price and keeps a
/// paper balance so sizing sees realistic funds.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    cash: f64,
    holdings: f64,
    orders: usize,
}

impl PaperBroker {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            cash: starting_cash,
            holdings: 0.0,
            orders: 0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holdings(&self) -> f64 {
        self.holdings
    }

    /// Number of filled orders
    pub fn order_count(&self) -> usize {
        self.orders
    }
}

#[async_trait]
impl Brokerage for PaperBroker {
    async fn available_funds(&mut self) -> anyhow::Result<f64> {
        Ok(self.cash)
    }

    async fn execute(&mut self, intent: &OrderIntent) -> Result<Fill, ExecutionError> {
        let notional = intent.reference_price * intent.quantity;

        match intent.action {
            OrderAction::Buy => {
                if notional > self.cash + EPSILON {
                    return Err(ExecutionError::Rejected(format!(
                        "insufficient paper cash: need ${:.2}, have ${:.2}",
                        notional, self.cash
                    )));
                }
                self.cash -= notional;
                self.holdings += intent.quantity;
            }
            OrderAction::Sell => {
                if intent.quantity > self.holdings + EPSILON {
                    return Err(ExecutionError::Rejected(format!(
                        "insufficient paper holdings: need {:.8}, have {:.8}",
                        intent.quantity, self.holdings
                    )));
                }
                self.cash += notional;
                self.holdings = (self.holdings - intent.quantity).max(0.0);
            }
        }
        self.orders += 1;

        tracing::info!(
            "📝 PAPER {} {:.8} @ ${:.4} ({})",
            intent.action,
            intent.quantity,
            intent.reference_price,
            intent.reason
        );

        Ok(Fill {
            order_id: intent.client_order_id,
            action: intent.action,
            price: intent.reference_price,
            quantity: intent.quantity,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntentReason;

    #[tokio::test]
    async fn test_paper_fill_echoes_intent() {
        let mut broker = PaperBroker::new(1_000.0);
        let intent = OrderIntent::new(OrderAction::Buy, 2.0, 100.0, IntentReason::Entry);

        let fill = broker.execute(&intent).await.unwrap();
        assert_eq!(fill.order_id, intent.client_order_id);
        assert_eq!(fill.price, 100.0);
        assert_eq!(fill.quantity, 2.0);
        assert_eq!(broker.available_funds().await.unwrap(), 800.0);
        assert_eq!(broker.holdings(), 2.0);
    }

    #[tokio::test]
    async fn test_round_trip_updates_cash() {
        let mut broker = PaperBroker::new(1_000.0);
        let buy = OrderIntent::new(OrderAction::Buy, 5.0, 100.0, IntentReason::Entry);
        broker.execute(&buy).await.unwrap();

        let sell = OrderIntent::new(OrderAction::Sell, 5.0, 103.0, IntentReason::TakeProfit);
        broker.execute(&sell).await.unwrap();

        assert!((broker.cash() - 1_015.0).abs() < 1e-9);
        assert_eq!(broker.holdings(), 0.0);
        assert_eq!(broker.order_count(), 2);
    }

    #[tokio::test]
    async fn test_rejects_overspend_without_changes() {
        let mut broker = PaperBroker::new(50.0);
        let intent = OrderIntent::new(OrderAction::Buy, 1.0, 100.0, IntentReason::Entry);

        let err = broker.execute(&intent).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Rejected(_)));
        assert_eq!(broker.cash(), 50.0);
        assert_eq!(broker.order_count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_selling_more_than_held() {
        let mut broker = PaperBroker::new(50.0);
        let intent = OrderIntent::new(OrderAction::Sell, 1.0, 100.0, IntentReason::StopLoss);
        assert!(broker.execute(&intent).await.is_err());
    }
}
