use super::moving_average::RollingWindow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Zero-width bands (flat window) carry no support/resistance information
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0
    }

    /// Whether `price` sits within `threshold_pct` percent of either band
    pub fn proximity(&self, price: f64, threshold_pct: f64) -> BandProximity {
        if self.is_degenerate() || price <= 0.0 {
            return BandProximity::default();
        }
        let to_upper = (self.upper - price) / price * 100.0;
        let to_lower = (price - self.lower) / price * 100.0;

        BandProximity {
            at_support: to_lower < threshold_pct,
            at_resistance: to_upper < threshold_pct,
        }
    }
}

/// Price close to (or beyond) the lower or upper band. Informational only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BandProximity {
    pub at_support: bool,
    pub at_resistance: bool,
}

/// Bollinger Bands: SMA(period) ± k·σ (population σ)
#[derive(Debug, Clone)]
pub struct Bollinger {
    window: RollingWindow,
    std_devs: f64,
}

impl Bollinger {
    pub fn new(period: usize, std_devs: f64) -> Self {
        Self {
            window: RollingWindow::new(period),
            std_devs,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<BollingerBands> {
        self.window.push(price);

        let middle = self.window.mean()?;
        let spread = self.window.std_dev()? * self.std_devs;

        Some(BollingerBands {
            upper: middle + spread,
            middle,
            lower: middle - spread,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_absent_until_full() {
        let mut bb = Bollinger::new(20, 2.0);
        for i in 0..19 {
            assert!(bb.update(100.0 + i as f64).is_none());
        }
        assert!(bb.update(120.0).is_some());
    }

    #[test]
    fn test_flat_prices_collapse_bands() {
        let mut bb = Bollinger::new(20, 2.0);
        let mut last = None;
        for _ in 0..30 {
            last = bb.update(100.0);
        }
        let bands = last.unwrap();
        assert_eq!(bands.middle, 100.0);
        assert_eq!(bands.width(), 0.0);
        assert!(bands.is_degenerate());
    }

    #[test]
    fn test_band_ordering() {
        let mut bb = Bollinger::new(5, 2.0);
        let prices = [100.0, 104.0, 98.0, 101.0, 107.0, 95.0, 99.0, 103.0, 90.0, 110.0];
        for p in prices {
            if let Some(bands) = bb.update(p) {
                assert!(bands.upper >= bands.middle);
                assert!(bands.middle >= bands.lower);
            }
        }
    }

    #[test]
    fn test_known_values() {
        let mut bb = Bollinger::new(4, 2.0);
        let mut last = None;
        for p in [2.0, 4.0, 4.0, 6.0] {
            last = bb.update(p);
        }
        let bands = last.unwrap();
        let sd = 2.0_f64.sqrt();
        assert_eq!(bands.middle, 4.0);
        assert!((bands.upper - (4.0 + 2.0 * sd)).abs() < 1e-12);
        assert!((bands.lower - (4.0 - 2.0 * sd)).abs() < 1e-12);
    }

    #[test]
    fn test_band_proximity() {
        let bands = BollingerBands {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        };

        let near_lower = bands.proximity(90.5, 1.0);
        assert!(near_lower.at_support);
        assert!(!near_lower.at_resistance);

        // beyond the band still counts
        assert!(bands.proximity(111.0, 1.0).at_resistance);

        assert_eq!(bands.proximity(100.0, 1.0), BandProximity::default());

        let flat = BollingerBands {
            upper: 100.0,
            middle: 100.0,
            lower: 100.0,
        };
        assert_eq!(flat.proximity(100.0, 1.0), BandProximity::default());
    }
}
