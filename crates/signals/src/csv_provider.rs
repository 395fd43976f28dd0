use async_trait::async_trait;
use chrono::Utc;
use pairs_trade_core::{
    BrokerError, InstrumentPair, QuoteSource, Signal, SignalError, SignalProvider,
};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::spread_file::{self, SpreadFileError, SpreadRow};

/// Signal provider backed by the model's spread-metrics CSV for one pair.
///
/// The last row is the current observation; older rows are history the
/// provider never looks at. Its prices also serve as quotes for the paper
/// broker.
#[derive(Debug, Clone)]
pub struct CsvSignalProvider {
    path: PathBuf,
    pair: InstrumentPair,
    max_age: Option<Duration>,
}

impl CsvSignalProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, pair: InstrumentPair) -> Self {
        Self {
            path: path.into(),
            pair,
            max_age: None,
        }
    }

    /// Treats rows older than `max_age` as missing data.
    #[must_use]
    pub const fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn pair(&self) -> &InstrumentPair {
        &self.pair
    }

    /// Latest usable row, or `InsufficientData` when there is none.
    ///
    /// # Errors
    /// `InsufficientData` for a missing, empty or stale file; `Provider` for
    /// unreadable or malformed data.
    pub async fn latest_row(&self) -> Result<SpreadRow, SignalError> {
        self.read_latest(true).await
    }

    /// Staleness only gates signals. Quotes for an open position keep
    /// coming from the last row however old it is.
    async fn read_latest(&self, check_age: bool) -> Result<SpreadRow, SignalError> {
        let path = self.path.clone();
        let row = tokio::task::spawn_blocking(move || spread_file::read_last_row(&path))
            .await
            .map_err(|e| SignalError::Provider(format!("spread file reader panicked: {e}")))?;

        let pair = self.pair.to_string();
        let row = match row {
            Ok(Some(row)) => row,
            Ok(None) => return Err(SignalError::insufficient(pair, "spread file has no rows")),
            Err(SpreadFileError::Missing(path)) => {
                return Err(SignalError::insufficient(
                    pair,
                    format!("{} not found", path.display()),
                ))
            }
            Err(e) => return Err(SignalError::Provider(e.to_string())),
        };

        if let Some(max_age) = self.max_age.filter(|_| check_age) {
            let age = Utc::now().signed_duration_since(row.timestamp);
            let stale = age
                .to_std()
                .map_or(false, |age| age > max_age);
            if stale {
                return Err(SignalError::insufficient(
                    pair,
                    format!("latest row at {} is older than {max_age:?}", row.timestamp),
                ));
            }
        }

        Ok(row)
    }

    fn check_pair(&self, first: &str, second: &str) -> Result<(), SignalError> {
        if self.pair.first() == first && self.pair.second() == second {
            return Ok(());
        }
        Err(SignalError::Provider(format!(
            "spread file {} holds {}, not {first}/{second}",
            self.path.display(),
            self.pair
        )))
    }
}

#[async_trait]
impl SignalProvider for CsvSignalProvider {
    async fn latest_signal(&self, first: &str, second: &str) -> Result<Signal, SignalError> {
        self.check_pair(first, second)?;
        let row = self.latest_row().await?;

        tracing::debug!(
            pair = %self.pair,
            signal = %row.signal,
            zscore = %row.zscore,
            hedge_ratio = %row.hedge_ratio,
            "Read spread signal"
        );

        Ok(Signal {
            value: row.signal,
            hedge_ratio: row.hedge_ratio,
            as_of: row.timestamp,
        })
    }
}

#[async_trait]
impl QuoteSource for CsvSignalProvider {
    async fn price(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        let row = self
            .read_latest(false)
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

        if symbol == self.pair.first() {
            Ok(row.price_a)
        } else if symbol == self.pair.second() {
            Ok(row.price_b)
        } else {
            Err(BrokerError::QuoteUnavailable(symbol.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairs_trade_core::SignalValue;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const HEADER: &str = "timestamp,price_a,price_b,zscore,signal,hedge_ratio\n";

    fn provider_for(body: &str) -> (tempfile::TempDir, CsvSignalProvider) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spread.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();

        let pair = InstrumentPair::new("KO", "PEP").unwrap();
        (dir, CsvSignalProvider::new(path, pair))
    }

    #[tokio::test]
    async fn returns_last_row() {
        let body = format!(
            "{HEADER}2024-03-01T14:30:00Z,61.20,170.10,-2.1,1,0.35\n\
             2024-03-01T14:31:00Z,61.40,169.80,2.3,-1,0.37\n"
        );
        let (_dir, provider) = provider_for(&body);

        let signal = provider.latest_signal("KO", "PEP").await.unwrap();

        assert_eq!(signal.value, SignalValue::Short);
        assert_eq!(signal.hedge_ratio, dec!(0.37));
    }

    #[tokio::test]
    async fn empty_file_is_insufficient_data() {
        let (_dir, provider) = provider_for(HEADER);

        let err = provider.latest_signal("KO", "PEP").await.unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[tokio::test]
    async fn missing_file_is_insufficient_data() {
        let pair = InstrumentPair::new("KO", "PEP").unwrap();
        let provider = CsvSignalProvider::new("/nonexistent/spread.csv", pair);

        let err = provider.latest_signal("KO", "PEP").await.unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[tokio::test]
    async fn stale_row_is_insufficient_data() {
        let body = format!("{HEADER}2020-01-02T00:00:00Z,61.20,170.10,-2.1,1,0.35\n");
        let (_dir, provider) = provider_for(&body);
        let provider = provider.with_max_age(Duration::from_secs(3600));

        let err = provider.latest_signal("KO", "PEP").await.unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[tokio::test]
    async fn quotes_ignore_signal_staleness() {
        let body = format!("{HEADER}2020-01-02T00:00:00Z,61.20,170.10,-2.1,1,0.35\n");
        let (_dir, provider) = provider_for(&body);
        let provider = provider.with_max_age(Duration::from_secs(1));

        assert!(provider.latest_row().await.unwrap_err().is_insufficient_data());
        assert_eq!(provider.price("KO").await.unwrap(), dec!(61.20));
        assert_eq!(provider.price("PEP").await.unwrap(), dec!(170.10));
    }

    #[tokio::test]
    async fn malformed_row_is_provider_failure() {
        let body = format!("{HEADER}2024-03-01T14:30:00Z,abc,170.10,-2.1,1,0.35\n");
        let (_dir, provider) = provider_for(&body);

        let err = provider.latest_signal("KO", "PEP").await.unwrap_err();
        assert!(matches!(err, SignalError::Provider(_)));
    }

    #[tokio::test]
    async fn wrong_pair_is_rejected() {
        let body = format!("{HEADER}2024-03-01T14:30:00Z,61.20,170.10,-2.1,1,0.35\n");
        let (_dir, provider) = provider_for(&body);

        let err = provider.latest_signal("PEP", "KO").await.unwrap_err();
        assert!(matches!(err, SignalError::Provider(_)));
    }

    #[tokio::test]
    async fn quotes_follow_leg_columns() {
        let body = format!("{HEADER}2024-03-01T14:30:00Z,61.20,170.10,-2.1,1,0.35\n");
        let (_dir, provider) = provider_for(&body);

        assert_eq!(provider.price("KO").await.unwrap(), dec!(61.20));
        assert_eq!(provider.price("PEP").await.unwrap(), dec!(170.10));
        assert_eq!(
            provider.price("MSFT").await.unwrap_err(),
            BrokerError::QuoteUnavailable("MSFT".to_string())
        );
    }
}
