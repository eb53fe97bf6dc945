// Trading engine module
//
// `TradingSession` is the pure per-pair pipeline. `StrategyLoop` wires it to
// a market data source and a brokerage on a timer.
pub mod session;
pub mod strategy_loop;

pub use session::{TickReport, TradingSession};
pub use strategy_loop::{LoopSettings, RunReport, StopReason, StrategyLoop};
