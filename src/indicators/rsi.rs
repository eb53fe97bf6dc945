/// Relative Strength Index (RSI) with Wilder smoothing
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// The first average gain/loss is the simple mean of the first `period`
/// changes; after that `avg = (avg * (period - 1) + change) / period`.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    prev_price: Option<f64>,
    seed_gain: f64,
    seed_loss: f64,
    seed_count: usize,
    averages: Option<(f64, f64)>, // (avg_gain, avg_loss)
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_price: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            seed_count: 0,
            averages: None,
        }
    }

    /// Feed the next price; returns RSI once `period + 1` prices were seen
    pub fn update(&mut self, price: f64) -> Option<f64> {
        let prev = self.prev_price.replace(price)?;

        let change = price - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let period = self.period as f64;

        match self.averages {
            Some((avg_gain, avg_loss)) => {
                self.averages = Some((
                    (avg_gain * (period - 1.0) + gain) / period,
                    (avg_loss * (period - 1.0) + loss) / period,
                ));
            }
            None => {
                self.seed_gain += gain;
                self.seed_loss += loss;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.averages = Some((self.seed_gain / period, self.seed_loss / period));
                }
            }
        }

        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        let (avg_gain, avg_loss) = self.averages?;
        Some(rsi_from_averages(avg_gain, avg_loss))
    }

    /// Number of prices needed before the first reading
    pub fn warmup(&self) -> usize {
        self.period + 1
    }
}

/// `100 - 100 / (1 + avg_gain / avg_loss)`
///
/// No losses means RSI 100; no movement at all means a neutral 50.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - (100.0 / (1.0 + rs))).clamp(0.0, 100.0)
}
