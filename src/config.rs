use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Invalid or unreadable configuration. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Indicator periods
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub ema_long: usize, // trend reading only
    pub volatility_window: usize,
    /// Distance to a band, in percent of price, that counts as "at" it
    pub band_proximity_pct: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
            ema_fast: 9,
            ema_slow: 21,
            ema_long: 50,
            volatility_window: 20,
            band_proximity_pct: 1.0,
        }
    }
}

/// Vote thresholds for the signal fuser
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    pub oversold_threshold: f64,
    pub overbought_threshold: f64,
    pub min_ready_indicators: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            oversold_threshold: 30.0,
            overbought_threshold: 70.0,
            min_ready_indicators: 2,
        }
    }
}

/// Risk envelope for the position manager
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub profit_target_pct: f64, // fraction, 0.03 = 3%
    pub stop_loss_pct: f64,     // fraction, 0.02 = 2%
    pub max_position_size: f64, // base-asset units
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub quantity_increment: f64, // lot size, 0 disables rounding
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            profit_target_pct: 0.03,
            stop_loss_pct: 0.02,
            max_position_size: 20.0,
            entry_threshold: 0.5,
            exit_threshold: 0.5,
            quantity_increment: 0.0,
        }
    }
}

/// Polling loop settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub symbol: String,
    pub poll_interval_seconds: u64,
    pub run_duration_seconds: u64,
    pub simulation_mode: bool,
    pub paper_funds: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            symbol: "XRP-USD".to_string(),
            poll_interval_seconds: 30,
            run_duration_seconds: 3600,
            simulation_mode: true,
            paper_funds: 1000.0,
        }
    }
}

impl RunConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_duration_seconds)
    }
}

/// Brokerage endpoint. Credentials come from the environment, never from files.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub requests_per_minute: u32,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trading.robinhood.com".to_string(),
            requests_per_minute: 100,
            timeout_seconds: 10,
        }
    }
}

/// Complete, immutable application configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub indicators: IndicatorConfig,
    pub fusion: FusionConfig,
    pub risk: RiskConfig,
    pub run: RunConfig,
    pub api: ApiConfig,
}

impl AppConfig {
    /// Load defaults, then `path` (if it exists), then `SIGNALBOT__*` env vars.
    ///
    /// Env keys use `__` between section and field, e.g.
    /// `SIGNALBOT__RISK__STOP_LOSS_PCT=0.015`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = match path {
            Some(p) => builder.add_source(File::from(p).required(true)),
            None => builder.add_source(File::with_name("Settings").required(false)),
        };

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix("SIGNALBOT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject any configuration that would run with a broken risk envelope.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        let fusion = &self.fusion;
        let risk = &self.risk;
        let run = &self.run;

        let periods = [
            ("rsi_period", ind.rsi_period),
            ("macd_fast", ind.macd_fast),
            ("macd_slow", ind.macd_slow),
            ("macd_signal", ind.macd_signal),
            ("bb_period", ind.bb_period),
            ("ema_fast", ind.ema_fast),
            ("ema_slow", ind.ema_slow),
            ("ema_long", ind.ema_long),
            ("volatility_window", ind.volatility_window),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(invalid(format!("{} must be > 0", name)));
            }
        }
        if ind.macd_fast >= ind.macd_slow {
            return Err(invalid("macd_fast must be shorter than macd_slow"));
        }
        if ind.ema_fast >= ind.ema_slow {
            return Err(invalid("ema_fast must be shorter than ema_slow"));
        }
        if ind.ema_slow >= ind.ema_long {
            return Err(invalid("ema_slow must be shorter than ema_long"));
        }
        if !(ind.band_proximity_pct.is_finite() && ind.band_proximity_pct >= 0.0) {
            return Err(invalid("band_proximity_pct must be >= 0"));
        }
        if !(ind.bb_std_dev.is_finite() && ind.bb_std_dev > 0.0) {
            return Err(invalid("bb_std_dev must be > 0"));
        }

        if !(0.0..=100.0).contains(&fusion.oversold_threshold)
            || !(0.0..=100.0).contains(&fusion.overbought_threshold)
        {
            return Err(invalid("RSI thresholds must lie in [0, 100]"));
        }
        if fusion.oversold_threshold >= fusion.overbought_threshold {
            return Err(invalid(
                "oversold_threshold must be below overbought_threshold",
            ));
        }
        if fusion.min_ready_indicators < 1 {
            return Err(invalid("min_ready_indicators must be >= 1"));
        }

        if !(risk.stop_loss_pct > 0.0 && risk.stop_loss_pct < 1.0) {
            return Err(invalid("stop_loss_pct must be in (0, 1)"));
        }
        if !(risk.profit_target_pct.is_finite() && risk.profit_target_pct > 0.0) {
            return Err(invalid("profit_target_pct must be > 0"));
        }
        if risk.stop_loss_pct >= risk.profit_target_pct {
            return Err(invalid(format!(
                "stop_loss_pct ({}) must be below profit_target_pct ({})",
                risk.stop_loss_pct, risk.profit_target_pct
            )));
        }
        if !(risk.max_position_size.is_finite() && risk.max_position_size > 0.0) {
            return Err(invalid("max_position_size must be > 0"));
        }
        for (name, value) in [
            ("entry_threshold", risk.entry_threshold),
            ("exit_threshold", risk.exit_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{} must lie in [0, 1]", name)));
            }
        }
        if !(risk.quantity_increment.is_finite() && risk.quantity_increment >= 0.0) {
            return Err(invalid("quantity_increment must be >= 0"));
        }

        if run.symbol.trim().is_empty() {
            return Err(invalid("symbol must not be empty"));
        }
        if run.poll_interval_seconds == 0 {
            return Err(invalid("poll_interval_seconds must be > 0"));
        }
        if run.run_duration_seconds == 0 {
            return Err(invalid("run_duration_seconds must be > 0"));
        }
        if run.simulation_mode && !(run.paper_funds.is_finite() && run.paper_funds >= 0.0) {
            return Err(invalid("paper_funds must be >= 0"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.indicators.rsi_period, 14);
        assert_eq!(config.fusion.overbought_threshold, 70.0);
        assert_eq!(config.fusion.oversold_threshold, 30.0);
        assert_eq!(config.risk.profit_target_pct, 0.03);
        assert_eq!(config.risk.stop_loss_pct, 0.02);
        assert_eq!(config.risk.entry_threshold, 0.5);
        assert_eq!(config.risk.exit_threshold, 0.5);
        assert!(config.run.simulation_mode);
    }

    #[test]
    fn test_stop_loss_must_be_below_target() {
        let mut config = AppConfig::default();
        config.risk.stop_loss_pct = 0.03;
        config.risk.profit_target_pct = 0.03;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stop_loss_pct"));
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut config = AppConfig::default();
        config.indicators.rsi_period = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_ema_periods_rejected() {
        let mut config = AppConfig::default();
        config.indicators.ema_fast = 30;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("ema_fast"));
    }

    #[test]
    fn test_long_ema_must_exceed_slow() {
        let mut config = AppConfig::default();
        config.indicators.ema_long = 21;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("ema_long"));
    }

    #[test]
    fn test_inverted_rsi_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.fusion.oversold_threshold = 75.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_range_checked() {
        let mut config = AppConfig::default();
        config.risk.entry_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("signalbot-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Settings.toml");
        std::fs::write(
            &path,
            "[risk]\nstop_loss_pct = 0.01\nmax_position_size = 5.0\n\n[run]\nsymbol = \"BTC-USD\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.risk.stop_loss_pct, 0.01);
        assert_eq!(config.risk.max_position_size, 5.0);
        assert_eq!(config.run.symbol, "BTC-USD");
        // untouched fields keep defaults
        assert_eq!(config.risk.profit_target_pct, 0.03);
        assert_eq!(config.indicators.bb_period, 20);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = std::env::temp_dir().join(format!("signalbot-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Settings.toml");
        std::fs::write(&path, "[risk]\nstop_loss_pct = 0.05\n").unwrap();

        let result = AppConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
