use super::session::TradingSession;
use crate::config::RunConfig;
use crate::execution::{Brokerage, FillOutcome, MarketData, MarketDataError, Position};
use crate::models::OrderIntent;
use crate::performance::PerformanceSummary;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

/// Timing for one run
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub run_duration: Duration,
    /// Stop after this many accepted ticks
    pub max_ticks: Option<u64>,
}

impl From<&RunConfig> for LoopSettings {
    fn from(run: &RunConfig) -> Self {
        Self {
            poll_interval: run.poll_interval(),
            run_duration: run.run_duration(),
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    Shutdown,
    MaxTicks,
    FeedExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Deadline => "run duration elapsed",
            StopReason::Shutdown => "shutdown requested",
            StopReason::MaxTicks => "tick limit reached",
            StopReason::FeedExhausted => "market data exhausted",
        };
        f.write_str(text)
    }
}

/// What happened during a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub ticks_processed: u64,
    pub ticks_rejected: u64,
    pub feed_errors: u64,
    pub orders_submitted: u64,
    pub orders_failed: u64,
    pub sizing_failures: u64,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
    pub summary: PerformanceSummary,
    pub position: Position,
    pub last_price: Option<f64>,
}

#[derive(Debug, Default)]
struct Counters {
    ticks_processed: u64,
    ticks_rejected: u64,
    feed_errors: u64,
    orders_submitted: u64,
    orders_failed: u64,
    sizing_failures: u64,
}

/// Polls market data on a fixed interval and drives one trading session
///
/// Each iteration is strictly sequential: tick, decide, execute, apply. A
/// shutdown request is honored between iterations, so an order that is
/// already in flight always gets its fill applied first.
pub struct StrategyLoop<M, B> {
    session: TradingSession,
    market: M,
    broker: B,
    settings: LoopSettings,
    shutdown: watch::Receiver<bool>,
}

impl<M: MarketData, B: Brokerage> StrategyLoop<M, B> {
    pub fn new(
        session: TradingSession,
        market: M,
        broker: B,
        settings: LoopSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            market,
            broker,
            settings,
            shutdown,
        }
    }

    pub fn session(&self) -> &TradingSession {
        &self.session
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub async fn run(&mut self) -> RunReport {
        let started = Instant::now();
        let deadline = started + self.settings.run_duration;

        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "🔄 Strategy loop starting for {} (every {:?}, for {:?})",
            self.session.symbol(),
            self.settings.poll_interval,
            self.settings.run_duration
        );

        let mut counters = Counters::default();
        let stop_reason = loop {
            if *self.shutdown.borrow() {
                break StopReason::Shutdown;
            }
            if let Some(max) = self.settings.max_ticks {
                if counters.ticks_processed >= max {
                    break StopReason::MaxTicks;
                }
            }

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break StopReason::Shutdown,
                _ = sleep_until(deadline) => break StopReason::Deadline,
                _ = ticker.tick() => {}
            }

            if let Some(reason) = self.step(&mut counters).await {
                break reason;
            }
        };

        tracing::info!(
            "⏹️  Strategy loop stopped ({}): {} ticks, {} orders",
            stop_reason,
            counters.ticks_processed,
            counters.orders_submitted
        );

        RunReport {
            ticks_processed: counters.ticks_processed,
            ticks_rejected: counters.ticks_rejected,
            feed_errors: counters.feed_errors,
            orders_submitted: counters.orders_submitted,
            orders_failed: counters.orders_failed,
            sizing_failures: counters.sizing_failures,
            elapsed: started.elapsed(),
            stop_reason,
            summary: self.session.summary(),
            position: self.session.position().clone(),
            last_price: self.session.last_price(),
        }
    }

    /// One iteration. Returns a stop reason when the run cannot continue.
    async fn step(&mut self, counters: &mut Counters) -> Option<StopReason> {
        let tick = match self.market.latest_tick().await {
            Ok(tick) => tick,
            Err(MarketDataError::Exhausted) => return Some(StopReason::FeedExhausted),
            Err(e) => {
                tracing::warn!("  ✗ Skipping tick: {}", e);
                counters.feed_errors += 1;
                return None;
            }
        };

        // funds only matter for entries
        let funds = if self.session.position().is_long() {
            0.0
        } else {
            match self.broker.available_funds().await {
                Ok(funds) => funds,
                Err(e) => {
                    tracing::warn!("  ✗ Failed to fetch buying power, assuming none: {}", e);
                    0.0
                }
            }
        };

        let report = match self.session.on_tick(tick, funds) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("  ✗ Rejected tick: {}", e);
                counters.ticks_rejected += 1;
                return None;
            }
        };
        counters.ticks_processed += 1;

        let snapshot = &report.snapshot;
        tracing::debug!(
            "  Indicators: {}/4 voting, RSI {:?}, volatility {:?}",
            snapshot.ready_count(),
            snapshot.rsi,
            snapshot.volatility_pct
        );
        if let Some(trend) = snapshot.trend {
            tracing::debug!("  Trend: {}", trend);
        }
        if let Some(proximity) = snapshot.band_proximity {
            if proximity.at_support {
                tracing::info!("  📉 Price near support (lower band)");
            }
            if proximity.at_resistance {
                tracing::info!("  📈 Price near resistance (upper band)");
            }
        }
        tracing::info!(
            "💹 {} ${:.4} | {} ({:.2}) | {}",
            self.session.symbol(),
            tick.price,
            report.signal.direction,
            report.signal.strength,
            self.session.position().state()
        );
        if let Some(pnl) = self.session.unrealized_pnl() {
            tracing::info!("  Unrealized P&L: ${:.2}", pnl);
        }

        if let Some(err) = report.sizing_error {
            tracing::warn!("  ✗ Entry skipped: {}", err);
            counters.sizing_failures += 1;
        }

        if let Some(intent) = report.intent {
            self.submit(intent, counters).await;
        }
        None
    }

    /// Execute an intent and apply its fill. A failed order leaves the session untouched.
    async fn submit(&mut self, intent: OrderIntent, counters: &mut Counters) {
        tracing::info!(
            "📤 Submitting {} {:.8} @ ~${:.4} ({})",
            intent.action,
            intent.quantity,
            intent.reference_price,
            intent.reason
        );
        counters.orders_submitted += 1;

        let fill = match self.broker.execute(&intent).await {
            Ok(fill) => fill,
            Err(e) => {
                counters.orders_failed += 1;
                tracing::error!("❌ Order {} failed: {}", intent.client_order_id, e);
                return;
            }
        };

        match self.session.on_fill(&intent, &fill) {
            Ok(FillOutcome::Opened(open)) => tracing::info!(
                "✅ Opened {:.8} @ ${:.4} (stop ${:.4}, target ${:.4})",
                open.quantity,
                open.entry_price,
                open.stop_loss_price,
                open.take_profit_price
            ),
            Ok(FillOutcome::Closed(trade)) => tracing::info!(
                "✅ Closed @ ${:.4}: P&L ${:.2} ({:+.2}%)",
                trade.exit_price,
                trade.pnl,
                trade.pnl_pct
            ),
            Ok(FillOutcome::Reduced { trade, remaining }) => tracing::warn!(
                "⚠️  Partially closed {:.8} @ ${:.4}: P&L ${:.2}, {:.8} still open",
                trade.quantity,
                trade.exit_price,
                trade.pnl,
                remaining.quantity
            ),
            Ok(FillOutcome::Duplicate) => {}
            Err(e) => tracing::error!("❌ Fill for {} not applied: {}", intent.client_order_id, e),
        }
    }
}

/// Resolves once the flag is set. A dropped sender never resolves.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
