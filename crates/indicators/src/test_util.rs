use crate::{Bar, BarReceiver, TickReceiver};
use chrono::{DateTime, Duration, Utc};

/// Asserts that two `f64` values agree within an absolute tolerance
/// (default `1e-9`).
macro_rules! assert_approx {
    ($actual:expr, $expected:expr) => {
        assert_approx!($actual, $expected, 1e-9)
    };
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (a, e): (f64, f64) = ($actual, $expected);
        assert!(
            (a - e).abs() <= $tolerance,
            "assert_approx failed: actual={a}, expected={e}, diff={}",
            (a - e).abs(),
        );
    }};
}

pub(crate) use assert_approx;

/// Bar on day `index` after the epoch.
pub fn ohlc(index: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    let timestamp = DateTime::<Utc>::UNIX_EPOCH + Duration::days(index as i64);
    Bar::new(timestamp, open, high, low, close, 0.0)
}

pub fn hlc(index: usize, high: f64, low: f64, close: f64) -> Bar {
    ohlc(index, close, high, low, close)
}

/// Feed scalar ticks with 1-based bar indices.
pub fn feed_ticks<R: TickReceiver>(receiver: &mut R, values: &[f64]) {
    for (i, value) in values.iter().enumerate() {
        receiver.receive_tick(*value, i + 1);
    }
}

/// Feed bars with 1-based bar indices.
pub fn feed_bars<R: BarReceiver>(receiver: &mut R, bars: &[Bar]) {
    for (i, bar) in bars.iter().enumerate() {
        receiver.receive_bar(bar, i + 1);
    }
}

/// A deterministic high/low/close walk with gaps in both directions.
pub fn sample_bars(count: usize) -> Vec<Bar> {
    let mut close: f64 = 100.0;
    (0..count)
        .map(|i| {
            let step = ((i * 7919) % 13) as f64 - 6.0;
            let open = close;
            close = (close + step * 0.35).max(1.0);
            let spread = 0.5 + ((i * 31) % 5) as f64 * 0.25;
            let high = open.max(close) + spread;
            let low = (open.min(close) - spread).max(0.1);
            ohlc(i, open, high, low, close)
        })
        .collect()
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close()).collect()
}
