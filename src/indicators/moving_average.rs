use std::collections::VecDeque;

/// Recompute running sums from scratch after this many evictions to
/// keep floating-point drift bounded on long runs.
const RESYNC_EVERY: usize = 1024;

/// Exponential Moving Average (EMA), updated one value at a time
///
/// Seeded with the simple average of the first `period` values, then
/// `ema = (value - ema) * k + ema` with `k = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    /// Feed the next value; returns the EMA once `period` values were seen
    pub fn update(&mut self, value: f64) -> Option<f64> {
        match self.value {
            Some(ema) => {
                self.value = Some((value - ema) * self.multiplier + ema);
            }
            None => {
                self.seed_sum += value;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Fixed-size window with running sum and sum of squares
///
/// Backs the Simple Moving Average and the population standard deviation
/// used by Bollinger Bands and volatility.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
    evictions: usize,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period + 1),
            sum: 0.0,
            sum_sq: 0.0,
            evictions: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;

        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
                self.evictions += 1;
            }
        }

        if self.evictions >= RESYNC_EVERY {
            self.sum = self.values.iter().sum();
            self.sum_sq = self.values.iter().map(|v| v * v).sum();
            self.evictions = 0;
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Simple Moving Average over a full window
    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.sum / self.period as f64)
    }

    /// Population standard deviation over a full window
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = (self.sum_sq / self.period as f64 - mean * mean).max(0.0);
        Some(variance.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_ema(prices: &[f64], period: usize) -> f64 {
        let multiplier = 2.0 / (period as f64 + 1.0);
        let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
        for price in &prices[period..] {
            ema = (price - ema) * multiplier + ema;
        }
        ema
    }

    #[test]
    fn test_sma() {
        let mut window = RollingWindow::new(5);
        for p in [100.0, 102.0, 104.0, 106.0, 108.0] {
            window.push(p);
        }
        assert_eq!(window.mean(), Some(104.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        let mut window = RollingWindow::new(5);
        window.push(100.0);
        window.push(102.0);
        assert!(window.mean().is_none());
        assert!(window.std_dev().is_none());
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        for p in [1.0, 2.0, 3.0, 4.0] {
            window.push(p);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), Some(3.0));
    }

    #[test]
    fn test_std_dev_flat_is_zero() {
        let mut window = RollingWindow::new(20);
        for _ in 0..30 {
            window.push(100.0);
        }
        assert_eq!(window.std_dev(), Some(0.0));
    }

    #[test]
    fn test_std_dev_population() {
        let mut window = RollingWindow::new(4);
        for p in [2.0, 4.0, 4.0, 6.0] {
            window.push(p);
        }
        // mean 4, squared deviations 4+0+0+4 = 8, /4 = 2
        let sd = window.std_dev().unwrap();
        assert!((sd - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let mut ema = Ema::new(5);
        let mut last = None;
        for p in [100.0, 102.0, 104.0, 106.0, 108.0] {
            last = ema.update(p);
        }
        assert_eq!(last, Some(104.0));
    }

    #[test]
    fn test_ema_absent_until_period() {
        let mut ema = Ema::new(5);
        for p in [100.0, 102.0, 104.0, 106.0] {
            assert!(ema.update(p).is_none());
        }
    }

    #[test]
    fn test_ema_matches_batch() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0, 107.0, 111.0];
        let mut ema = Ema::new(5);
        for p in &prices {
            ema.update(*p);
        }
        let expected = batch_ema(&prices, 5);
        assert!((ema.value().unwrap() - expected).abs() < 1e-9);
        assert!(ema.value().unwrap() > 104.0); // EMA should be above initial SMA
    }
}
