//! Market data access.
//!
//! Bars come from a local JSON cache keyed by symbol and date range,
//! one file per `{symbol}_{start}_{end}.json`. A missing file is not an
//! error: it means no data, which callers surface as a `no_data` result.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::strategy::Bar;
use crate::task::DATE_FORMAT;

/// Market data failures.
#[derive(Debug, Error)]
pub enum DataError {
    /// Reading a cache file failed.
    #[error("cache read failed for {path}: {source}")]
    Io {
        /// Cache file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A cache file held malformed JSON.
    #[error("cache parse failed for {path}: {source}")]
    Parse {
        /// Cache file path.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Pluggable bar source.
pub trait MarketData: Send + Sync {
    /// Fetch bars for `symbol` over the inclusive date range, sorted by
    /// date ascending. An empty vector means no data is available.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] when a cache file exists but cannot be read
    /// or parsed.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;
}

/// Cache file layout: either a bare bar list or a `{"bars": [...]}`
/// wrapper.
#[derive(Deserialize)]
#[serde(untagged)]
enum CacheFile {
    Bars(Vec<Bar>),
    Wrapped {
        bars: Vec<Bar>,
    },
}

/// JSON file cache under a single directory.
#[derive(Debug, Clone)]
pub struct JsonCacheMarketData {
    cache_dir: PathBuf,
}

impl JsonCacheMarketData {
    /// Build a cache reader rooted at `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn cache_path(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
        let name = format!(
            "{symbol}_{}_{}.json",
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        );
        self.cache_dir.join(name)
    }
}

fn read_cache_file(path: &Path) -> Result<Vec<Bar>, DataError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: CacheFile = serde_json::from_str(&raw).map_err(|source| DataError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(match parsed {
        CacheFile::Bars(bars) | CacheFile::Wrapped { bars } => bars,
    })
}

impl MarketData for JsonCacheMarketData {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.cache_path(symbol, start, end);
        if !path.exists() {
            debug!(symbol, path = %path.display(), "cache miss");
            return Ok(Vec::new());
        }

        let start_key = start.format(DATE_FORMAT).to_string();
        let end_key = end.format(DATE_FORMAT).to_string();
        let mut bars: Vec<Bar> = read_cache_file(&path)?
            .into_iter()
            .filter(|bar| bar.date.as_str() >= start_key.as_str() && bar.date.as_str() <= end_key.as_str())
            .collect();
        bars.sort_by(|a, b| a.date.cmp(&b.date));
        debug!(symbol, bars = bars.len(), "cache hit");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn write_cache(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonCacheMarketData::new(dir.path());
        let bars = source
            .fetch_bars("000858.SZ", date("20230101"), date("20231231"))
            .unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn bare_list_parses_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_cache(
            dir.path(),
            "AAPL_20230101_20230131.json",
            r#"[
                {"date":"20230105","open":10,"high":11,"low":9,"close":10.5,"volume":100},
                {"date":"20230103","open":10,"high":11,"low":9,"close":10.1,"volume":100},
                {"date":"20230301","open":12,"high":13,"low":11,"close":12.5,"volume":100}
            ]"#,
        );
        let source = JsonCacheMarketData::new(dir.path());
        let bars = source
            .fetch_bars("AAPL", date("20230101"), date("20230131"))
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, "20230103");
        assert_eq!(bars[1].close, dec!(10.5));
    }

    #[test]
    fn wrapped_object_parses() {
        let dir = tempfile::tempdir().unwrap();
        write_cache(
            dir.path(),
            "AAPL_20230101_20230131.json",
            r#"{"bars":[{"date":"20230103","open":10,"high":11,"low":9,"close":10.1}]}"#,
        );
        let source = JsonCacheMarketData::new(dir.path());
        let bars = source
            .fetch_bars("AAPL", date("20230101"), date("20230131"))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, dec!(0));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_cache(dir.path(), "AAPL_20230101_20230131.json", "{not json");
        let source = JsonCacheMarketData::new(dir.path());
        let err = source
            .fetch_bars("AAPL", date("20230101"), date("20230131"))
            .unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
    }
}
