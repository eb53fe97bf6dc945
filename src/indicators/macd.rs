use super::moving_average::Ema;
use serde::{Deserialize, Serialize};

/// MACD reading with the previous histogram carried along for crossing checks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MacdReading {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
    pub prev_histogram: Option<f64>,
}

impl MacdReading {
    /// Histogram went from zero or below to positive
    pub fn turned_positive(&self) -> bool {
        matches!(self.prev_histogram, Some(prev) if prev <= 0.0 && self.histogram > 0.0)
    }

    /// Histogram went from zero or above to negative
    pub fn turned_negative(&self) -> bool {
        matches!(self.prev_histogram, Some(prev) if prev >= 0.0 && self.histogram < 0.0)
    }
}

/// Moving Average Convergence Divergence
///
/// MACD = EMA(fast) - EMA(slow), signal = EMA(signal) of MACD,
/// histogram = MACD - signal.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    last_histogram: Option<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            last_histogram: None,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<MacdReading> {
        let fast = self.fast.update(price);
        let slow = self.slow.update(price);

        let value = fast? - slow?;
        let signal = self.signal.update(value)?;
        let histogram = value - signal;

        let reading = MacdReading {
            value,
            signal,
            histogram,
            prev_histogram: self.last_histogram,
        };
        self.last_histogram = Some(histogram);

        Some(reading)
    }

    /// Number of prices needed before the first reading
    pub fn warmup(&self) -> usize {
        self.slow.period() + self.signal.period() - 1
    }
}
