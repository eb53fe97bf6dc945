use crate::config::FusionConfig;
use crate::indicators::IndicatorSnapshot;
use crate::models::{Direction, Signal};
use std::fmt;

/// One indicator's opinion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Buy => write!(f, "BUY"),
            Vote::Sell => write!(f, "SELL"),
            Vote::Neutral => write!(f, "neutral"),
        }
    }
}

/// Vote cast by a ready indicator, with the reading that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorVote {
    pub indicator: &'static str,
    pub vote: Vote,
    pub detail: String,
}

impl IndicatorVote {
    fn new(indicator: &'static str, vote: Vote, detail: String) -> Self {
        Self {
            indicator,
            vote,
            detail,
        }
    }

    pub fn reason(&self) -> String {
        format!("{}: {} ({})", self.indicator, self.vote, self.detail)
    }
}

/// Multi-indicator confirmation by majority vote
///
/// Each ready indicator votes BUY, SELL or neutral. Absent indicators do not
/// vote and are left out of the strength denominator.
///
/// - RSI below oversold => BUY, above overbought => SELL
/// - MACD histogram turning positive => BUY, turning negative => SELL
/// - Price at/below the lower band => BUY, at/above the upper band => SELL
/// - EMA fast crossing above slow => BUY, crossing below => SELL
#[derive(Debug, Clone)]
pub struct SignalFuser {
    config: FusionConfig,
}

impl SignalFuser {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Votes of every ready indicator, in a fixed order (RSI, MACD, BB, EMA)
    pub fn votes(&self, snapshot: &IndicatorSnapshot) -> Vec<IndicatorVote> {
        let mut votes = Vec::with_capacity(4);

        if let Some(rsi) = snapshot.rsi {
            let vote = if rsi < self.config.oversold_threshold {
                IndicatorVote::new(
                    "RSI",
                    Vote::Buy,
                    format!("{:.1} < {:.0}", rsi, self.config.oversold_threshold),
                )
            } else if rsi > self.config.overbought_threshold {
                IndicatorVote::new(
                    "RSI",
                    Vote::Sell,
                    format!("{:.1} > {:.0}", rsi, self.config.overbought_threshold),
                )
            } else {
                IndicatorVote::new("RSI", Vote::Neutral, format!("{:.1}", rsi))
            };
            votes.push(vote);
        }

        if let Some(macd) = snapshot.macd {
            let (vote, detail) = if macd.turned_positive() {
                (Vote::Buy, "histogram turned positive")
            } else if macd.turned_negative() {
                (Vote::Sell, "histogram turned negative")
            } else {
                (Vote::Neutral, "no crossing")
            };
            votes.push(IndicatorVote::new(
                "MACD",
                vote,
                format!("{}, hist {:.4}", detail, macd.histogram),
            ));
        }

        if let Some(bands) = snapshot.bollinger {
            let price = snapshot.price;
            let vote = if bands.is_degenerate() {
                IndicatorVote::new("BB", Vote::Neutral, "zero-width bands".to_string())
            } else if price <= bands.lower {
                IndicatorVote::new(
                    "BB",
                    Vote::Buy,
                    format!("price {:.4} <= lower {:.4}", price, bands.lower),
                )
            } else if price >= bands.upper {
                IndicatorVote::new(
                    "BB",
                    Vote::Sell,
                    format!("price {:.4} >= upper {:.4}", price, bands.upper),
                )
            } else {
                IndicatorVote::new(
                    "BB",
                    Vote::Neutral,
                    format!("inside {:.4}..{:.4}", bands.lower, bands.upper),
                )
            };
            votes.push(vote);
        }

        if let Some(ema) = snapshot.ema {
            let (vote, detail) = if ema.crossed_above() {
                (Vote::Buy, "fast crossed above slow")
            } else if ema.crossed_below() {
                (Vote::Sell, "fast crossed below slow")
            } else {
                (Vote::Neutral, "no crossing")
            };
            votes.push(IndicatorVote::new(
                "EMA",
                vote,
                format!("{}, {:.4}/{:.4}", detail, ema.fast, ema.slow),
            ));
        }

        votes
    }

    /// Fuse a snapshot into a single signal
    pub fn evaluate(&self, snapshot: &IndicatorSnapshot) -> Signal {
        fuse(&self.votes(snapshot), self.config.min_ready_indicators)
    }
}

/// Count votes. The result depends only on the multiset of votes.
pub fn fuse(votes: &[IndicatorVote], min_ready: usize) -> Signal {
    let reasons: Vec<String> = votes.iter().map(IndicatorVote::reason).collect();
    let ready = votes.len();

    if ready < min_ready {
        let mut reasons = reasons;
        reasons.push(format!(
            "insufficient confirmation: {} of {} indicators ready",
            ready, min_ready
        ));
        return Signal::hold(reasons);
    }

    let buys = votes.iter().filter(|v| v.vote == Vote::Buy).count();
    let sells = votes.iter().filter(|v| v.vote == Vote::Sell).count();

    let (direction, majority) = if buys > sells {
        (Direction::Buy, buys)
    } else if sells > buys {
        (Direction::Sell, sells)
    } else {
        return Signal::hold(reasons);
    };

    Signal {
        direction,
        strength: majority as f64 / ready as f64,
        reasons,
    }
}
