use crate::types::InstrumentPair;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default seconds between polls of the execution loop.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Invalid strategy parameters, detected before the loop starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("pair must name exactly two instruments, got {0}")]
    PairArity(usize),

    #[error("instrument identifier must not be empty")]
    EmptyInstrument,

    #[error("pair instruments must be distinct, got {0} twice")]
    DuplicateInstrument(String),

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: Decimal },

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}

fn require_positive(field: &'static str, value: Decimal) -> Result<Decimal, ConfigError> {
    if value <= Decimal::ZERO {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(value)
}

fn require_non_negative(field: &'static str, value: Decimal) -> Result<Decimal, ConfigError> {
    if value < Decimal::ZERO {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(value)
}

/// How the first leg's quantity is derived before leverage and hedge ratio apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Sizing {
    /// Fixed number of units of the first instrument.
    Units { base_quantity: Decimal },
    /// Fraction of account equity, converted to units at the first leg's quote.
    EquityFraction { fraction: Decimal },
}

impl Default for Sizing {
    fn default() -> Self {
        Self::Units {
            base_quantity: Decimal::ONE,
        }
    }
}

impl Sizing {
    fn validate(self) -> Result<Self, ConfigError> {
        match self {
            Self::Units { base_quantity } => {
                require_positive("sizing.base_quantity", base_quantity)?;
            }
            Self::EquityFraction { fraction } => {
                require_positive("sizing.fraction", fraction)?;
            }
        }
        Ok(self)
    }
}

/// Validated, immutable parameters for one strategy session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyConfig {
    pair: InstrumentPair,
    hedge_ratio: Decimal,
    leverage: Decimal,
    take_profit_pct: Decimal,
    stop_loss_pct: Decimal,
    sizing: Sizing,
    poll_interval: Duration,
}

impl StrategyConfig {
    /// Validates the core strategy parameters.
    ///
    /// Thresholds are fractional (`0.05` = 5%); a threshold of zero disables
    /// that bound.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for non-positive hedge ratio or leverage and for
    /// negative thresholds.
    pub fn new(
        pair: InstrumentPair,
        hedge_ratio: Decimal,
        leverage: Decimal,
        take_profit_pct: Decimal,
        stop_loss_pct: Decimal,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            pair,
            hedge_ratio: require_positive("hedge_ratio", hedge_ratio)?,
            leverage: require_positive("leverage", leverage)?,
            take_profit_pct: require_non_negative("take_profit_pct", take_profit_pct)?,
            stop_loss_pct: require_non_negative("stop_loss_pct", stop_loss_pct)?,
            sizing: Sizing::default(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        })
    }

    /// Builds a config from file settings, using `hedge_ratio` when the
    /// settings leave it unset.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if any setting is invalid.
    pub fn from_settings(
        settings: &StrategySettings,
        fallback_hedge_ratio: Decimal,
    ) -> Result<Self, ConfigError> {
        let pair = InstrumentPair::from_list(&settings.pair)?;
        Self::new(
            pair,
            settings.hedge_ratio.unwrap_or(fallback_hedge_ratio),
            settings.leverage,
            settings.take_profit_pct,
            settings.stop_loss_pct,
        )?
        .with_sizing(settings.sizing)?
        .with_poll_interval(Duration::from_secs(settings.poll_interval_secs))
    }

    /// # Errors
    /// Returns [`ConfigError::NonPositive`] for a zero or negative size.
    pub fn with_sizing(mut self, sizing: Sizing) -> Result<Self, ConfigError> {
        self.sizing = sizing.validate()?;
        Ok(self)
    }

    /// # Errors
    /// Returns [`ConfigError::ZeroPollInterval`] for a zero duration.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Result<Self, ConfigError> {
        if poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.poll_interval = poll_interval;
        Ok(self)
    }

    #[must_use]
    pub const fn pair(&self) -> &InstrumentPair {
        &self.pair
    }

    #[must_use]
    pub const fn hedge_ratio(&self) -> Decimal {
        self.hedge_ratio
    }

    #[must_use]
    pub const fn leverage(&self) -> Decimal {
        self.leverage
    }

    #[must_use]
    pub const fn take_profit_pct(&self) -> Decimal {
        self.take_profit_pct
    }

    #[must_use]
    pub const fn stop_loss_pct(&self) -> Decimal {
        self.stop_loss_pct
    }

    #[must_use]
    pub const fn sizing(&self) -> Sizing {
        self.sizing
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Top-level application configuration loaded by [`ConfigLoader`](crate::ConfigLoader).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub strategy: StrategySettings,
    #[serde(default)]
    pub signals: SignalSourceConfig,
    #[serde(default)]
    pub paper: PaperBrokerConfig,
}

/// Unvalidated strategy parameters as they appear in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    pub pair: Vec<String>,
    /// Overrides the model's hedge ratio; when unset the latest signal's ratio is used.
    #[serde(default)]
    pub hedge_ratio: Option<Decimal>,
    #[serde(default = "default_leverage")]
    pub leverage: Decimal,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    #[serde(default)]
    pub sizing: Sizing,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Location of the spread-metrics file written by the cointegration model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSourceConfig {
    pub path: PathBuf,
    /// Rows older than this are treated as missing data.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl Default for SignalSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/spread.csv"),
            max_age_secs: None,
        }
    }
}

/// Simulated account used when no live broker is wired in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperBrokerConfig {
    #[serde(default = "default_initial_equity")]
    pub initial_equity: Decimal,
    /// Flat commission charged per unit traded.
    #[serde(default)]
    pub commission_per_unit: Decimal,
}

impl Default for PaperBrokerConfig {
    fn default() -> Self {
        Self {
            initial_equity: default_initial_equity(),
            commission_per_unit: Decimal::ZERO,
        }
    }
}

const fn default_leverage() -> Decimal {
    Decimal::ONE
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_initial_equity() -> Decimal {
    Decimal::from(100_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pair() -> InstrumentPair {
        InstrumentPair::new("KO", "PEP").unwrap()
    }

    #[test]
    fn new_applies_defaults() {
        let config = StrategyConfig::new(pair(), dec!(2.0), dec!(1.0), dec!(0.1), dec!(0.05)).unwrap();

        assert_eq!(config.sizing(), Sizing::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.hedge_ratio(), dec!(2.0));
    }

    #[test]
    fn rejects_non_positive_leverage_and_hedge_ratio() {
        let err = StrategyConfig::new(pair(), dec!(2.0), dec!(0), dec!(0.1), dec!(0.05)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonPositive {
                field: "leverage",
                value: dec!(0)
            }
        );

        let err = StrategyConfig::new(pair(), dec!(-1.5), dec!(1), dec!(0.1), dec!(0.05)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonPositive {
                field: "hedge_ratio",
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_thresholds() {
        let err = StrategyConfig::new(pair(), dec!(1), dec!(1), dec!(0.1), dec!(-0.05)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Negative {
                field: "stop_loss_pct",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_poll_interval_and_sizes() {
        let config = StrategyConfig::new(pair(), dec!(1), dec!(1), dec!(0.1), dec!(0.05)).unwrap();

        assert_eq!(
            config.clone().with_poll_interval(Duration::ZERO),
            Err(ConfigError::ZeroPollInterval)
        );
        assert!(config
            .with_sizing(Sizing::EquityFraction {
                fraction: dec!(0)
            })
            .is_err());
    }

    #[test]
    fn from_settings_falls_back_to_model_hedge_ratio() {
        let settings = StrategySettings {
            pair: vec!["KO".to_string(), "PEP".to_string()],
            hedge_ratio: None,
            leverage: dec!(2),
            take_profit_pct: dec!(0.1),
            stop_loss_pct: dec!(0.05),
            sizing: Sizing::default(),
            poll_interval_secs: 5,
        };

        let config = StrategyConfig::from_settings(&settings, dec!(1.37)).unwrap();
        assert_eq!(config.hedge_ratio(), dec!(1.37));
        assert_eq!(config.poll_interval(), Duration::from_secs(5));

        let pinned = StrategySettings {
            hedge_ratio: Some(dec!(0.9)),
            ..settings
        };
        let config = StrategyConfig::from_settings(&pinned, dec!(1.37)).unwrap();
        assert_eq!(config.hedge_ratio(), dec!(0.9));
    }

    #[test]
    fn sizing_deserializes_tagged() {
        let sizing: Sizing =
            serde_json::from_str(r#"{"mode":"equity_fraction","fraction":"0.25"}"#).unwrap();
        assert_eq!(
            sizing,
            Sizing::EquityFraction {
                fraction: dec!(0.25)
            }
        );
    }
}
