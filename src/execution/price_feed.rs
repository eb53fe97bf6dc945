use super::{MarketData, MarketDataError};
use crate::models::PriceTick;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Seeded random-walk price source for offline dry runs
///
/// Each tick moves the price by a uniform step in `[-volatility, +volatility]`
/// (as a fraction) plus `drift`. Timestamps advance by a fixed step, so the
/// feed is fully reproducible for a given seed.
pub struct SyntheticFeed {
    rng: StdRng,
    price: f64,
    volatility: f64,
    drift: f64,
    clock: DateTime<Utc>,
    step: Duration,
}

impl SyntheticFeed {
    pub fn new(seed: u64, start_price: f64, volatility: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            price: start_price,
            volatility,
            drift: 0.0,
            clock: Utc::now(),
            step: Duration::seconds(30),
        }
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    /// Spacing between generated timestamps
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn next_tick(&mut self) -> PriceTick {
        let shock: f64 = self.rng.gen_range(-self.volatility..=self.volatility);
        // never let the walk reach zero
        self.price = (self.price * (1.0 + self.drift + shock)).max(0.0001);
        self.clock += self.step;
        PriceTick::new(self.clock, self.price)
    }
}

#[async_trait]
impl MarketData for SyntheticFeed {
    async fn latest_tick(&mut self) -> Result<PriceTick, MarketDataError> {
        Ok(self.next_tick())
    }
}

/// Replays a fixed price path, then reports `Exhausted`
pub struct ReplayFeed {
    prices: VecDeque<f64>,
    clock: DateTime<Utc>,
    step: Duration,
}

impl ReplayFeed {
    pub fn new(prices: impl IntoIterator<Item = f64>) -> Self {
        Self {
            prices: prices.into_iter().collect(),
            clock: Utc::now(),
            step: Duration::seconds(30),
        }
    }

    pub fn remaining(&self) -> usize {
        self.prices.len()
    }
}

#[async_trait]
impl MarketData for ReplayFeed {
    async fn latest_tick(&mut self) -> Result<PriceTick, MarketDataError> {
        let price = self.prices.pop_front().ok_or(MarketDataError::Exhausted)?;
        self.clock += self.step;
        Ok(PriceTick::new(self.clock, price))
    }
}
