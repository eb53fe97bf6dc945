// Risk management module
//
// Position sizing and exit levels. Nothing here holds state; the position
// manager owns the position and asks these limits what is allowed.

use crate::config::RiskConfig;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Why no order could be sized. Recoverable: the next tick tries again.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingError {
    #[error("no funds available ({0:.2})")]
    NoFunds(f64),
    #[error("invalid price for sizing: {0}")]
    InvalidPrice(f64),
    #[error("order quantity {quantity} rounds to nothing (increment {increment})")]
    BelowIncrement { quantity: f64, increment: f64 },
    #[error("quantity {0} cannot be represented as a decimal")]
    Unrepresentable(f64),
}

/// Immutable risk envelope shared by every decision for one pair
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLimits {
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
    pub max_position_size: f64,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub quantity_increment: f64,
}

impl From<&RiskConfig> for RiskLimits {
    fn from(config: &RiskConfig) -> Self {
        Self {
            profit_target_pct: config.profit_target_pct,
            stop_loss_pct: config.stop_loss_pct,
            max_position_size: config.max_position_size,
            entry_threshold: config.entry_threshold,
            exit_threshold: config.exit_threshold,
            quantity_increment: config.quantity_increment,
        }
    }
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self::from(&RiskConfig::default())
    }
}

impl RiskLimits {
    pub fn stop_loss_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_pct)
    }

    pub fn take_profit_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.profit_target_pct)
    }

    /// Entry size: `min(max_position_size, funds / price)`, floored to the lot size
    ///
    /// # Arguments
    /// * `price` - Current price of the base asset
    /// * `available_funds` - Quote currency available for the order
    ///
    /// # Returns
    /// A quantity with `0 < quantity <= available_funds / price`
    pub fn size_order(&self, price: f64, available_funds: f64) -> Result<f64, SizingError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(SizingError::InvalidPrice(price));
        }
        if !available_funds.is_finite() || available_funds <= 0.0 {
            return Err(SizingError::NoFunds(available_funds));
        }

        let affordable = available_funds / price;
        let quantity = normalize_quantity(
            self.max_position_size.min(affordable),
            self.quantity_increment,
        )?;

        if quantity <= 0.0 {
            return Err(SizingError::BelowIncrement {
                quantity: affordable,
                increment: self.quantity_increment,
            });
        }

        Ok(quantity)
    }
}

/// Round `amount` down to a multiple of `step` (step 0 leaves it alone)
pub fn normalize_quantity(amount: f64, step: f64) -> Result<f64, SizingError> {
    if step <= 0.0 {
        return Ok(amount);
    }

    let amount_dec = Decimal::from_f64(amount).ok_or(SizingError::Unrepresentable(amount))?;
    let step_dec = Decimal::from_f64(step).ok_or(SizingError::Unrepresentable(step))?;

    amount_dec
        .checked_div(step_dec)
        .map(|units| units.floor() * step_dec)
        .and_then(|q| q.to_f64())
        .ok_or(SizingError::Unrepresentable(amount))
}
