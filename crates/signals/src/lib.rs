pub mod csv_provider;
pub mod spread_file;
pub mod tickers;

pub use csv_provider::CsvSignalProvider;
pub use spread_file::{SpreadFileError, SpreadRow};
pub use tickers::{parse_tickers, read_tickers, TickerFileError};
