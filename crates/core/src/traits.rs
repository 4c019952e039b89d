use crate::models::*;

// ---------------------------------------------------------------------------
// Result delivery
// ---------------------------------------------------------------------------

/// The single destination an indicator delivers its results to.
///
/// A sink is either storage (a leaf indicator appending to its series) or the
/// input of another indicator (chained usage).
pub trait Sink<T> {
    fn accept(&mut self, value: T, bar_index: usize);
}

impl<T> Sink<T> for Vec<T> {
    fn accept(&mut self, value: T, _bar_index: usize) {
        self.push(value);
    }
}

/// Adapter turning any `FnMut(value, bar_index)` into a [`Sink`].
pub struct FnSink<F>(pub F);

impl<T, F> Sink<T> for FnSink<F>
where
    F: FnMut(T, usize),
{
    fn accept(&mut self, value: T, bar_index: usize) {
        (self.0)(value, bar_index)
    }
}

impl<F> std::fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnSink")
    }
}

/// Values whose extremes feed an indicator's running min/max bounds.
pub trait Bounded {
    /// `(lowest, highest)` component of the value.
    fn extremes(&self) -> (f64, f64);
}

impl Bounded for f64 {
    fn extremes(&self) -> (f64, f64) {
        (*self, *self)
    }
}

// ---------------------------------------------------------------------------
// Tick ingestion
// ---------------------------------------------------------------------------

/// Consumer of scalar ticks.
pub trait TickReceiver {
    fn receive_tick(&mut self, value: f64, bar_index: usize);
}

/// Consumer of whole bars. `bar_index` is the 1-based position of the bar in
/// the stream it came from.
pub trait BarReceiver {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize);
}

// ---------------------------------------------------------------------------
// Indicator bookkeeping
// ---------------------------------------------------------------------------

/// Read-only view of an indicator's lookback and result bounds.
pub trait Indicator {
    /// Leading bars consumed before the first result.
    fn lookback_period(&self) -> usize;

    /// Number of results produced so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bar index of the first result, `None` until one is produced.
    fn valid_from_bar(&self) -> Option<usize>;

    /// Lowest result produced so far.
    fn min_value(&self) -> Option<f64>;

    /// Highest result produced so far.
    fn max_value(&self) -> Option<f64>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while constructing an indicator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("{name} {value} is outside the allowed range [{min}, {max}]")]
    PeriodOutOfRange {
        name: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
    #[error("Invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Errors that can occur while reading bar data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
