use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single OHLCV bar.
///
/// Bars are immutable once built: the stream hub owns them and indicators only
/// ever see a shared reference for the duration of one fan-out pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Scalar projection of a [`Bar`] fed into a single-input indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
    /// `(high + low) / 2`
    Median,
    /// `(high + low + close) / 3`
    Typical,
    /// `(open + high + low + close) / 4`
    Average,
    /// `(high + low + close + close) / 4`
    WeightedClose,
}

impl PriceSource {
    #[inline]
    pub fn extract(self, bar: &Bar) -> f64 {
        match self {
            Self::Open => bar.open,
            Self::High => bar.high,
            Self::Low => bar.low,
            Self::Close => bar.close,
            Self::Volume => bar.volume,
            Self::Median => (bar.high + bar.low) / 2.0,
            Self::Typical => (bar.high + bar.low + bar.close) / 3.0,
            Self::Average => (bar.open + bar.high + bar.low + bar.close) / 4.0,
            Self::WeightedClose => (bar.high + bar.low + bar.close + bar.close) / 4.0,
        }
    }
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
            Self::Median => "median",
            Self::Typical => "typical",
            Self::Average => "average",
            Self::WeightedClose => "weighted_close",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Time periods
// ---------------------------------------------------------------------------

/// The kind of bar a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarInterval {
    Daily,
    Weekly,
    Monthly,
    Intraday { minutes: u32 },
}

impl std::fmt::Display for BarInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Intraday { minutes } => write!(f, "{minutes}m"),
        }
    }
}

/// Standard tick time periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickTimePeriod {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    ThirtyMinute,
    FifteenMinute,
    FiveMinute,
    OneMinute,
    ThirtySecond,
    FifteenSecond,
    FiveSecond,
    OneSecond,
    Tick,
}

impl TickTimePeriod {
    /// Every period, longest first.
    pub const ALL: [TickTimePeriod; 14] = [
        Self::Yearly,
        Self::Monthly,
        Self::Weekly,
        Self::Daily,
        Self::Hourly,
        Self::ThirtyMinute,
        Self::FifteenMinute,
        Self::FiveMinute,
        Self::OneMinute,
        Self::ThirtySecond,
        Self::FifteenSecond,
        Self::FiveSecond,
        Self::OneSecond,
        Self::Tick,
    ];

    /// Seconds covered by one period. A month is 30 days, a year 365 days and
    /// a raw tick has no duration.
    pub const fn seconds(self) -> u32 {
        match self {
            Self::Yearly => 365 * 86_400,
            Self::Monthly => 30 * 86_400,
            Self::Weekly => 7 * 86_400,
            Self::Daily => 86_400,
            Self::Hourly => 3_600,
            Self::ThirtyMinute => 1_800,
            Self::FifteenMinute => 900,
            Self::FiveMinute => 300,
            Self::OneMinute => 60,
            Self::ThirtySecond => 30,
            Self::FifteenSecond => 15,
            Self::FiveSecond => 5,
            Self::OneSecond => 1,
            Self::Tick => 0,
        }
    }
}
