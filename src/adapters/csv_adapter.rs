//! CSV bar loader. One file per code, `{CODE}.csv`, with a header row.
//!
//! Required columns: date, open, high, low, close, volume. Optional:
//! bid_close, ask_close. Columns are located by header name, so order and
//! extra columns do not matter. Blank quote cells read as absent.

use crate::domain::error::VolshieldError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    bid_close: Option<usize>,
    ask_close: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord, path: &str) -> Result<Self, VolshieldError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| VolshieldError::Data {
                reason: format!("{}: missing {} column", path, name),
            })
        };
        Ok(Columns {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            bid_close: find("bid_close"),
            ask_close: find("ask_close"),
        })
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str, line: u64) -> Result<&'r str, VolshieldError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| VolshieldError::Data {
            reason: format!("line {}: missing {} value", line, name),
        })
}

fn parse_price(record: &StringRecord, idx: usize, name: &str, line: u64) -> Result<f64, VolshieldError> {
    field(record, idx, name, line)?
        .parse()
        .map_err(|e| VolshieldError::Data {
            reason: format!("line {}: invalid {} value: {}", line, name, e),
        })
}

fn parse_quote(record: &StringRecord, idx: Option<usize>, name: &str, line: u64) -> Result<Option<f64>, VolshieldError> {
    match idx.and_then(|i| record.get(i)).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|e| VolshieldError::Data {
            reason: format!("line {}: invalid {} value: {}", line, name, e),
        }),
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, VolshieldError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Err(VolshieldError::NoData {
                code: code.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let path_str = path.display().to_string();

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| VolshieldError::Data {
            reason: format!("{}: CSV header error: {}", path_str, e),
        })?;
        let cols = Columns::from_headers(headers, &path_str)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| VolshieldError::Data {
                reason: format!("{}: CSV parse error: {}", path_str, e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let date_str = field(&record, cols.date, "date", line)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| VolshieldError::Data {
                reason: format!("line {}: invalid date format: {}", line, e),
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            let volume_str = field(&record, cols.volume, "volume", line)?;
            let volume = volume_str
                .parse::<i64>()
                .or_else(|_| volume_str.parse::<f64>().map(|v| v as i64))
                .map_err(|e| VolshieldError::Data {
                    reason: format!("line {}: invalid volume value: {}", line, e),
                })?;

            bars.push(OhlcvBar {
                code: code.to_string(),
                date,
                open: parse_price(&record, cols.open, "open", line)?,
                high: parse_price(&record, cols.high, "high", line)?,
                low: parse_price(&record, cols.low, "low", line)?,
                close: parse_price(&record, cols.close, "close", line)?,
                volume,
                bid_close: parse_quote(&record, cols.bid_close, "bid_close", line)?,
                ask_close: parse_quote(&record, cols.ask_close, "ask_close", line)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }
}
