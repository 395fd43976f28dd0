//! Comma-separated ticker lists used to seed pair analysis.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TickerFileError {
    #[error("ticker file {0} not found")]
    NotFound(PathBuf),

    #[error("failed to read ticker file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Splits on commas, trims and uppercases each entry, and drops entries of
/// one character or fewer.
#[must_use]
pub fn parse_tickers(contents: &str) -> Vec<String> {
    contents
        .split(',')
        .map(str::trim)
        .filter(|ticker| ticker.chars().count() > 1)
        .map(str::to_uppercase)
        .collect()
}

/// Reads and parses a ticker file.
///
/// # Errors
/// [`TickerFileError::NotFound`] when the file does not exist, `Io` for any
/// other read failure.
pub fn read_tickers(path: impl AsRef<Path>) -> Result<Vec<String>, TickerFileError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            TickerFileError::NotFound(path.to_path_buf())
        } else {
            TickerFileError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    Ok(parse_tickers(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_filters_entries() {
        let tickers = parse_tickers(" ko, pep ,x,, msft\n,A ");
        assert_eq!(tickers, vec!["KO", "PEP", "MSFT"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_tickers("").is_empty());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.csv");
        std::fs::write(&path, "aapl,msft,goog").unwrap();

        assert_eq!(read_tickers(&path).unwrap(), vec!["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn missing_file_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tickers(dir.path().join("symbols.csv")).unwrap_err();
        assert!(matches!(err, TickerFileError::NotFound(_)));
    }
}
