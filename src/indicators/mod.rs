// Technical indicators module
// Incremental RSI, MACD, Bollinger Bands, EMA and volatility fed one tick at a time.
// Trend and band proximity ride along for logging and never vote.

pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod trend;
pub mod volatility;

pub use bollinger::{BandProximity, Bollinger, BollingerBands};
pub use macd::{Macd, MacdReading};
pub use moving_average::{Ema, RollingWindow};
pub use rsi::WilderRsi;
pub use trend::Trend;
pub use volatility::Volatility;

use crate::config::IndicatorConfig;
use crate::models::PriceTick;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A tick the bank refused. The bank's state is unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    #[error("out-of-order tick: {got} is not after {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
}

/// Fast/slow EMA pair with the previous pair for crossover checks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EmaCross {
    pub fast: f64,
    pub slow: f64,
    pub previous: Option<(f64, f64)>,
}

impl EmaCross {
    pub fn crossed_above(&self) -> bool {
        matches!(self.previous, Some((pf, ps)) if pf <= ps && self.fast > self.slow)
    }

    pub fn crossed_below(&self) -> bool {
        matches!(self.previous, Some((pf, ps)) if pf >= ps && self.fast < self.slow)
    }
}

/// Indicator readings after one tick. `None` = not enough history yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub rsi: Option<f64>,
    pub macd: Option<MacdReading>,
    pub bollinger: Option<BollingerBands>,
    pub ema: Option<EmaCross>,
    pub volatility_pct: Option<f64>,
    pub ema_long: Option<f64>,
    /// Needs fast, slow and long EMAs
    pub trend: Option<Trend>,
    pub band_proximity: Option<BandProximity>,
}

impl IndicatorSnapshot {
    /// How many of the voting indicators have a reading
    pub fn ready_count(&self) -> usize {
        [
            self.rsi.is_some(),
            self.macd.is_some(),
            self.bollinger.is_some(),
            self.ema.is_some(),
        ]
        .iter()
        .filter(|&&ready| ready)
        .count()
    }
}

/// Rolling indicator state for one trading pair
///
/// Every indicator keeps its own running aggregates, so `update` costs the
/// same no matter how long the bot has been running.
#[derive(Debug, Clone)]
pub struct IndicatorBank {
    history: VecDeque<PriceTick>,
    capacity: usize,
    rsi: WilderRsi,
    macd: Macd,
    bollinger: Bollinger,
    ema_fast: Ema,
    ema_slow: Ema,
    ema_long: Ema,
    last_ema: Option<(f64, f64)>,
    volatility: Volatility,
    band_proximity_pct: f64,
}

impl IndicatorBank {
    pub fn new(config: &IndicatorConfig) -> Self {
        let rsi = WilderRsi::new(config.rsi_period);
        let macd = Macd::new(config.macd_fast, config.macd_slow, config.macd_signal);

        let capacity = [
            rsi.warmup(),
            macd.warmup(),
            config.bb_period,
            config.ema_slow,
            config.ema_long,
            config.volatility_window + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1);

        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
            rsi,
            macd,
            bollinger: Bollinger::new(config.bb_period, config.bb_std_dev),
            ema_fast: Ema::new(config.ema_fast),
            ema_slow: Ema::new(config.ema_slow),
            ema_long: Ema::new(config.ema_long),
            last_ema: None,
            volatility: Volatility::new(config.volatility_window),
            band_proximity_pct: config.band_proximity_pct,
        }
    }

    /// Apply one tick and return the fresh readings
    pub fn update(&mut self, tick: PriceTick) -> Result<IndicatorSnapshot, TickError> {
        if !tick.price.is_finite() || tick.price <= 0.0 {
            return Err(TickError::InvalidPrice(tick.price));
        }
        if let Some(last) = self.history.back() {
            if tick.timestamp <= last.timestamp {
                return Err(TickError::OutOfOrder {
                    last: last.timestamp,
                    got: tick.timestamp,
                });
            }
        }

        self.history.push_back(tick);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let price = tick.price;
        let rsi = self.rsi.update(price);
        let macd = self.macd.update(price);
        let bollinger = self.bollinger.update(price);
        let volatility_pct = self.volatility.update(price);

        let fast = self.ema_fast.update(price);
        let slow = self.ema_slow.update(price);
        let ema_long = self.ema_long.update(price);
        let trend = match (fast, slow, ema_long) {
            (Some(short), Some(medium), Some(long)) => Some(Trend::from_emas(short, medium, long)),
            _ => None,
        };
        let band_proximity = bollinger.map(|bands| bands.proximity(price, self.band_proximity_pct));

        let ema = match (fast, slow) {
            (Some(fast), Some(slow)) => {
                let cross = EmaCross {
                    fast,
                    slow,
                    previous: self.last_ema,
                };
                self.last_ema = Some((fast, slow));
                Some(cross)
            }
            _ => None,
        };

        Ok(IndicatorSnapshot {
            timestamp: tick.timestamp,
            price,
            rsi,
            macd,
            bollinger,
            ema,
            volatility_pct,
            ema_long,
            trend,
            band_proximity,
        })
    }

    /// Retained price history, oldest first
    pub fn history(&self) -> impl Iterator<Item = &PriceTick> {
        self.history.iter()
    }

    pub fn last_tick(&self) -> Option<&PriceTick> {
        self.history.back()
    }

    /// Ticks needed before every indicator reports
    pub fn warmup(&self) -> usize {
        self.capacity
    }
}
