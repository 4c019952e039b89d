use crate::date_parsers::TextDateParser;
use chrono::{DateTime, Utc};
use std::io;
use tickstream_core::{Bar, DataError};

/// Zero-based column positions of a delimited bar record.
///
/// `high`, `low` and `close` are required. An absent date column yields the
/// unix epoch; absent open or volume columns yield `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub date: Option<usize>,
    pub open: Option<usize>,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: Option<usize>,
}

impl ColumnLayout {
    /// `date, open, high, low, close, volume` in columns 0 to 5.
    pub fn dohlcv() -> Self {
        Self {
            date: Some(0),
            open: Some(1),
            high: 2,
            low: 3,
            close: 4,
            volume: Some(5),
        }
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::dohlcv()
    }
}

/// Read every record from `source` into bars, in file order.
pub fn read_bars<R, P>(
    source: R,
    layout: &ColumnLayout,
    parser: &P,
    has_headers: bool,
) -> Result<Vec<Bar>, DataError>
where
    R: io::Read,
    P: TextDateParser + ?Sized,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut bars = Vec::new();
    for result in reader.records() {
        let record =
            result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        bars.push(parse_record(&record, line, layout, parser)?);
    }
    Ok(bars)
}

fn parse_record<P>(
    record: &csv::StringRecord,
    line: u64,
    layout: &ColumnLayout,
    parser: &P,
) -> Result<Bar, DataError>
where
    P: TextDateParser + ?Sized,
{
    let timestamp = match layout.date {
        Some(idx) => {
            let text = field(record, idx, "date", line)?;
            parser
                .parse(text)
                .map_err(|e| DataError::ParseError(format!("line {}: {}", line, e)))?
        }
        None => DateTime::<Utc>::UNIX_EPOCH,
    };
    let open = optional_price(record, layout.open, "open", line)?;
    let high = parse_price(field(record, layout.high, "high", line)?, "high", line)?;
    let low = parse_price(field(record, layout.low, "low", line)?, "low", line)?;
    let close = parse_price(field(record, layout.close, "close", line)?, "close", line)?;
    let volume = optional_price(record, layout.volume, "volume", line)?;

    Ok(Bar::new(timestamp, open, high, low, close, volume))
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<&'r str, DataError> {
    record.get(idx).ok_or_else(|| {
        DataError::ParseError(format!(
            "line {}: no {} column at index {} ({} fields)",
            line,
            name,
            idx,
            record.len()
        ))
    })
}

fn optional_price(
    record: &csv::StringRecord,
    idx: Option<usize>,
    name: &str,
    line: u64,
) -> Result<f64, DataError> {
    match idx {
        Some(idx) => parse_price(field(record, idx, name, line)?, name, line),
        None => Ok(0.0),
    }
}

fn parse_price(s: &str, name: &str, line: u64) -> Result<f64, DataError> {
    s.parse::<f64>().map_err(|e| {
        DataError::ParseError(format!(
            "line {}: failed to parse {} '{}': {}",
            line, name, s, e
        ))
    })
}
