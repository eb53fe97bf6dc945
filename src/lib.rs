// Core modules
pub mod api;
pub mod config;
pub mod engine;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod performance;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::{StrategyLoop, TradingSession};
pub use models::*;
pub use strategy::SignalFuser;
