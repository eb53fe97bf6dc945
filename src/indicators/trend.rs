use serde::{Deserialize, Serialize};
use std::fmt;

/// Market direction from the ordering of short, medium and long EMAs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl Trend {
    /// short > medium > long is an uptrend, the reverse a downtrend,
    /// anything else sideways
    pub fn from_emas(short: f64, medium: f64, long: f64) -> Self {
        if short > medium && medium > long {
            Trend::Uptrend
        } else if short < medium && medium < long {
            Trend::Downtrend
        } else {
            Trend::Sideways
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "uptrend"),
            Trend::Downtrend => write!(f, "downtrend"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_alignment() {
        assert_eq!(Trend::from_emas(103.0, 102.0, 100.0), Trend::Uptrend);
        assert_eq!(Trend::from_emas(97.0, 98.0, 100.0), Trend::Downtrend);
        assert_eq!(Trend::from_emas(101.0, 99.0, 100.0), Trend::Sideways);
        // equal averages are not aligned
        assert_eq!(Trend::from_emas(100.0, 100.0, 100.0), Trend::Sideways);
        assert_eq!(Trend::Uptrend.to_string(), "uptrend");
    }
}
