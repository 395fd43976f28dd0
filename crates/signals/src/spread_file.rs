//! Spread-metrics CSV written by the cointegration model.
//!
//! Format: `timestamp,price_a,price_b,zscore,signal,hedge_ratio`

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pairs_trade_core::SignalValue;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const HEADER: [&str; 6] = [
    "timestamp",
    "price_a",
    "price_b",
    "zscore",
    "signal",
    "hedge_ratio",
];

#[derive(Debug, Error)]
pub enum SpreadFileError {
    #[error("spread file {0} does not exist")]
    Missing(PathBuf),

    #[error("failed to read spread file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: missing column {column}")]
    MissingColumn { line: u64, column: &'static str },

    #[error("line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
}

/// One observation of the pair spread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadRow {
    pub timestamp: DateTime<Utc>,
    pub price_a: Decimal,
    pub price_b: Decimal,
    pub zscore: Decimal,
    pub signal: SignalValue,
    pub hedge_ratio: Decimal,
}

impl SpreadRow {
    fn from_record(record: &csv::StringRecord) -> Result<Self, SpreadFileError> {
        let line = record.position().map_or(0, csv::Position::line);

        let field = |index: usize| {
            record
                .get(index)
                .map(str::trim)
                .ok_or(SpreadFileError::MissingColumn {
                    line,
                    column: HEADER[index],
                })
        };
        let invalid = |index: usize, value: &str| SpreadFileError::InvalidValue {
            line,
            column: HEADER[index],
            value: value.to_string(),
        };
        let decimal = |index: usize| -> Result<Decimal, SpreadFileError> {
            let raw = field(index)?;
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .map_err(|_| invalid(index, raw))
        };

        let raw_timestamp = field(0)?;
        let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| invalid(0, raw_timestamp))?;

        // The model writes the signal as an integer, sometimes with a trailing `.0`
        let raw_signal = field(4)?;
        let signal = raw_signal
            .strip_suffix(".0")
            .unwrap_or(raw_signal)
            .parse::<i8>()
            .ok()
            .and_then(|value| SignalValue::try_from(value).ok())
            .ok_or_else(|| invalid(4, raw_signal))?;

        Ok(Self {
            timestamp,
            price_a: decimal(1)?,
            price_b: decimal(2)?,
            zscore: decimal(3)?,
            signal,
            hedge_ratio: decimal(5)?,
        })
    }
}

/// Accepts RFC 3339 as well as the naive `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DD` forms, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads only the last row of a spread file, `None` when it has no data rows.
///
/// # Errors
/// Returns [`SpreadFileError::Missing`] if the file does not exist and a
/// parse error for the first malformed row.
pub fn read_last_row(path: &Path) -> Result<Option<SpreadRow>, SpreadFileError> {
    let mut reader = open(path)?;
    let mut last = None;
    for record in reader.records() {
        last = Some(record.map_err(|source| csv_error(path, source))?);
    }
    last.as_ref().map(SpreadRow::from_record).transpose()
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, SpreadFileError> {
    if !path.exists() {
        return Err(SpreadFileError::Missing(path.to_path_buf()));
    }
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| csv_error(path, source))
}

fn csv_error(path: &Path, source: csv::Error) -> SpreadFileError {
    SpreadFileError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn last_row_wins_over_earlier_rows() {
        let file = write_csv(
            "timestamp,price_a,price_b,zscore,signal,hedge_ratio\n\
             2024-03-01T14:30:00Z,61.20,170.10,-2.1,1,0.35\n\
             2024-03-01 14:31:00,61.25,170.00,-0.2,0.0,0.36\n",
        );

        let row = read_last_row(file.path()).unwrap().unwrap();

        assert_eq!(row.signal, SignalValue::Neutral);
        assert_eq!(row.price_b, dec!(170.00));
        assert_eq!(row.hedge_ratio, dec!(0.36));
        assert_eq!(
            row.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 14, 31, 0).unwrap()
        );
    }

    #[test]
    fn last_row_of_empty_file_is_none() {
        let file = write_csv("timestamp,price_a,price_b,zscore,signal,hedge_ratio\n");
        assert_eq!(read_last_row(file.path()).unwrap(), None);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_last_row(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, SpreadFileError::Missing(_)));
    }

    #[test]
    fn rejects_out_of_range_signal() {
        let file = write_csv(
            "timestamp,price_a,price_b,zscore,signal,hedge_ratio\n\
             2024-03-01,61.20,170.10,3.0,2,0.35\n",
        );

        let err = read_last_row(file.path()).unwrap_err();
        assert!(matches!(
            err,
            SpreadFileError::InvalidValue {
                column: "signal",
                ..
            }
        ));
    }

    #[test]
    fn accepts_scientific_notation() {
        let file = write_csv(
            "timestamp,price_a,price_b,zscore,signal,hedge_ratio\n\
             2024-03-01,61.20,170.10,1.5e-3,-1,0.35\n",
        );

        let row = read_last_row(file.path()).unwrap().unwrap();
        assert_eq!(row.zscore, dec!(0.0015));
        assert_eq!(row.signal, SignalValue::Short);
    }
}
