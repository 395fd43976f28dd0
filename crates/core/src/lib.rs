pub mod config;
pub mod config_loader;
pub mod error;
pub mod position;
pub mod position_sizing;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, ConfigError, PaperBrokerConfig, SignalSourceConfig, Sizing, StrategyConfig,
    StrategySettings,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use error::{BrokerError, SignalError};
pub use position::Holding;
pub use position_sizing::{LegQuantities, SizingError};
pub use traits::{BrokerGateway, QuoteSource, SignalProvider};
pub use types::{InstrumentPair, InvalidSignal, OrderConfirmation, Side, Signal, SignalValue};
