use super::moving_average::RollingWindow;

/// Rolling volatility: population σ of percentage price changes
///
/// Informational only. Logged alongside the snapshot, never voted.
#[derive(Debug, Clone)]
pub struct Volatility {
    changes: RollingWindow,
    prev_price: Option<f64>,
}

impl Volatility {
    pub fn new(window: usize) -> Self {
        Self {
            changes: RollingWindow::new(window),
            prev_price: None,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        if let Some(prev) = self.prev_price.replace(price) {
            self.changes.push((price - prev) / prev * 100.0);
        }
        self.changes.std_dev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_market_has_no_volatility() {
        let mut vol = Volatility::new(5);
        let mut last = None;
        for _ in 0..10 {
            last = vol.update(100.0);
        }
        assert_eq!(last, Some(0.0));
    }

    #[test]
    fn test_needs_window_plus_one_prices() {
        let mut vol = Volatility::new(3);
        assert!(vol.update(100.0).is_none());
        assert!(vol.update(101.0).is_none());
        assert!(vol.update(100.0).is_none());
        assert!(vol.update(101.0).is_some());
    }

    #[test]
    fn test_choppy_beats_steady() {
        let mut steady = Volatility::new(10);
        let mut choppy = Volatility::new(10);
        let mut s = None;
        let mut c = None;
        for i in 0..20 {
            s = steady.update(100.0 * 1.001_f64.powi(i));
            c = choppy.update(if i % 2 == 0 { 100.0 } else { 104.0 });
        }
        assert!(c.unwrap() > s.unwrap());
    }
}
