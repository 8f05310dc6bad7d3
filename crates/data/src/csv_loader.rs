use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use taflow_core::{interval_duration, Candle, DataError, Trade};
use tracing::{debug, warn};

/// Load closed candles from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `timestamp` (or `date`, `datetime`, `time`, `open_time`), `open`, `high`,
/// `low`, `close`, optional `volume`. The timestamp is the candle's open
/// time; the close time is derived from `interval`.
pub fn load_candles_from_csv(path: &Path, interval: &str) -> Result<Vec<Candle>, DataError> {
    let file = std::fs::File::open(path)?;
    load_candles_from_reader(file, interval)
}

pub fn load_candles_from_reader<R: Read>(input: R, interval: &str) -> Result<Vec<Candle>, DataError> {
    let step = interval_duration(interval)
        .ok_or_else(|| DataError::ParseError(format!("Unknown interval '{}'", interval)))?;

    let mut reader = reader(input);
    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();
    let cols = resolve_candle_columns(&headers)?;

    let mut candles = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;
        let open_time = parse_timestamp(field(&record, cols.timestamp)?)?;
        let volume = match cols.volume {
            Some(idx) => parse_decimal(field(&record, idx)?, "volume")?,
            None => Decimal::ZERO,
        };
        candles.push(Candle {
            open_time,
            close_time: open_time + step,
            open: parse_decimal(field(&record, cols.open)?, "open")?,
            high: parse_decimal(field(&record, cols.high)?, "high")?,
            low: parse_decimal(field(&record, cols.low)?, "low")?,
            close: parse_decimal(field(&record, cols.close)?, "close")?,
            volume,
            closed: true,
        });
    }

    let rows = candles.len();
    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);
    if candles.len() < rows {
        warn!(dropped = rows - candles.len(), "duplicate candle timestamps in CSV");
    }
    debug!(candles = candles.len(), interval, "loaded candles");
    Ok(candles)
}

/// Load trades from a CSV file.
///
/// Expected columns: `timestamp`, `price`, `quantity` (or `qty`, `size`,
/// `amount`), optional `id` and either `is_buyer_maker` or `side`
/// (`buy`/`sell`, the aggressor). Missing ids are numbered by row.
pub fn load_trades_from_csv(path: &Path) -> Result<Vec<Trade>, DataError> {
    let file = std::fs::File::open(path)?;
    load_trades_from_reader(file)
}

pub fn load_trades_from_reader<R: Read>(input: R) -> Result<Vec<Trade>, DataError> {
    let mut reader = reader(input);
    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();

    let ts_col = find_column(&headers, &["timestamp", "time", "date", "datetime"])
        .ok_or_else(|| DataError::ParseError("No timestamp column found".into()))?;
    let price_col = find_column(&headers, &["price", "p"])
        .ok_or_else(|| DataError::ParseError("No price column found".into()))?;
    let qty_col = find_column(&headers, &["quantity", "qty", "size", "amount", "q"])
        .ok_or_else(|| DataError::ParseError("No quantity column found".into()))?;
    let id_col = find_column(&headers, &["id", "trade_id", "agg_trade_id"]);
    let maker_col = find_column(&headers, &["is_buyer_maker", "buyer_maker", "m"]);
    let side_col = find_column(&headers, &["side"]);

    let mut trades = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;
        let trade_id = match id_col {
            Some(idx) => {
                let raw = field(&record, idx)?;
                raw.parse::<u64>()
                    .map_err(|e| DataError::ParseError(format!("Failed to parse id '{}': {}", raw, e)))?
            }
            None => row as u64,
        };
        let is_buyer_maker = match (maker_col, side_col) {
            (Some(idx), _) => parse_bool(field(&record, idx)?)?,
            (None, Some(idx)) => field(&record, idx)?.eq_ignore_ascii_case("sell"),
            (None, None) => false,
        };
        trades.push(Trade {
            trade_id,
            timestamp: parse_timestamp(field(&record, ts_col)?)?,
            price: parse_decimal(field(&record, price_col)?, "price")?,
            quantity: parse_decimal(field(&record, qty_col)?, "quantity")?,
            is_buyer_maker,
        });
    }

    trades.sort_by_key(|t| t.timestamp);
    debug!(trades = trades.len(), "loaded trades");
    Ok(trades)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

struct CandleColumnMap {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

fn resolve_candle_columns(headers: &csv::StringRecord) -> Result<CandleColumnMap, DataError> {
    let ts = find_column(headers, &["timestamp", "open_time", "date", "datetime", "time"])
        .ok_or_else(|| DataError::ParseError("No timestamp column found".into()))?;
    let open = find_column(headers, &["open", "o"])
        .ok_or_else(|| DataError::ParseError("No open column found".into()))?;
    let high = find_column(headers, &["high", "h"])
        .ok_or_else(|| DataError::ParseError("No high column found".into()))?;
    let low = find_column(headers, &["low", "l"])
        .ok_or_else(|| DataError::ParseError("No low column found".into()))?;
    let close = find_column(headers, &["close", "c"])
        .ok_or_else(|| DataError::ParseError("No close column found".into()))?;
    let volume = find_column(headers, &["volume", "vol", "v"]);

    Ok(CandleColumnMap {
        timestamp: ts,
        open,
        high,
        low,
        close,
        volume,
    })
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    })
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize) -> Result<&'a str, DataError> {
    record
        .get(idx)
        .ok_or_else(|| DataError::ParseError(format!("Missing column {} in row {:?}", idx, record.position())))
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, DataError> {
    Decimal::from_str(s.trim())
        .or_else(|_| Decimal::from_scientific(s.trim()))
        .map_err(|e| DataError::ParseError(format!("Failed to parse {} '{}': {}", field, s, e)))
}

fn parse_bool(s: &str) -> Result<bool, DataError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(DataError::ParseError(format!("Failed to parse flag '{}'", other))),
    }
}

/// Unix timestamps above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DataError> {
    let s = s.trim();

    // RFC 3339 / ISO 8601 with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Common formats without timezone, assumed UTC
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y%m%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }

    // Unix seconds or milliseconds
    if let Ok(ts) = s.parse::<i64>() {
        let dt = if ts.abs() >= MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = dt {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError(format!("Unable to parse timestamp: '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candles_with_aliases_and_derived_close_time() {
        let csv = "Date,O,H,L,C,Vol\n\
                   2024-01-01 00:01:00,2,3,1,2.5,10\n\
                   2024-01-01 00:00:00,1,2,0.5,1.5,20\n";
        let candles = load_candles_from_reader(csv.as_bytes(), "1m").unwrap();
        assert_eq!(candles.len(), 2);
        let first = &candles[0];
        assert_eq!(first.open_time, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(first.close_time, first.open_time + Duration::minutes(1));
        assert_eq!(first.close, dec!(1.5));
        assert_eq!(first.volume, dec!(20));
        assert!(first.closed);
    }

    #[test]
    fn test_millisecond_timestamps() {
        let csv = "open_time,open,high,low,close\n1704067200000,1,1,1,1\n";
        let candles = load_candles_from_reader(csv.as_bytes(), "1h").unwrap();
        assert_eq!(candles[0].open_time, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(candles[0].volume, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_interval_rejected() {
        let csv = "timestamp,open,high,low,close\n";
        assert!(matches!(load_candles_from_reader(csv.as_bytes(), "7x"), Err(DataError::ParseError(_))));
    }

    #[test]
    fn test_missing_column_rejected() {
        let csv = "timestamp,open,high,close\n2024-01-01,1,1,1\n";
        assert!(load_candles_from_reader(csv.as_bytes(), "1d").is_err());
    }

    #[test]
    fn test_trades_with_side_column() {
        let csv = "time,price,qty,side\n\
                   2024-01-01T00:00:02Z,100,0.5,sell\n\
                   2024-01-01T00:00:01Z,101,2,buy\n";
        let trades = load_trades_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, dec!(101));
        assert!(!trades[0].is_buyer_maker);
        assert!(trades[1].is_buyer_maker);
        assert_eq!(trades[1].trade_id, 0);
    }
}
