use crate::ema::Ema;
use crate::{
    check_period, Bounded, IndicatorCore, IndicatorError, Latest, PriceSource, Sink, TickReceiver,
};
use serde::{Deserialize, Serialize};

/// MACD output with all three components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Bounded for MacdValue {
    fn extremes(&self) -> (f64, f64) {
        (
            self.macd.min(self.signal).min(self.histogram),
            self.macd.max(self.signal).max(self.histogram),
        )
    }
}

/// MACD (Moving Average Convergence Divergence).
///
/// Composed of three EMAs:
/// - Fast EMA (default 12)
/// - Slow EMA (default 26)
/// - Signal EMA (default 9) over the MACD line
///
/// The fast EMA skips the first `slow - fast` ticks so that both averages are
/// seeded from the same final window and emit together. Lookback is
/// `slow + signal - 2`.
#[derive(Debug, Clone)]
pub struct Macd<S = Vec<MacdValue>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    fast_period: usize,
    slow_period: usize,
    fast_ema: Ema<Latest<f64>>,
    slow_ema: Ema<Latest<f64>>,
    signal_ema: Ema<Latest<f64>>,
    ticks_seen: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, IndicatorError> {
        Self::with_sink(fast_period, slow_period, signal_period, Vec::new())
    }

    /// Standard MACD (12, 26, 9).
    pub fn default_periods() -> Result<Self, IndicatorError> {
        Self::new(12, 26, 9)
    }
}

impl<S> Macd<S> {
    pub fn with_sink(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
        sink: S,
    ) -> Result<Self, IndicatorError> {
        let fast_period = check_period("fastPeriod", fast_period, 2)?;
        let slow_period = check_period("slowPeriod", slow_period, 2)?;
        let signal_period = check_period("signalPeriod", signal_period, 2)?;
        if fast_period >= slow_period {
            return Err(IndicatorError::InvalidParameter {
                name: "fastPeriod",
                reason: format!("{fast_period} must be less than slow period {slow_period}"),
            });
        }

        Ok(Self {
            core: IndicatorCore::new(slow_period + signal_period - 2, sink),
            source: PriceSource::default(),
            fast_period,
            slow_period,
            fast_ema: Ema::with_sink(fast_period, Latest::default())?,
            slow_ema: Ema::with_sink(slow_period, Latest::default())?,
            signal_ema: Ema::with_sink(signal_period, Latest::default())?,
            ticks_seen: 0,
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast_period
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period
    }

    pub fn signal_period(&self) -> usize {
        self.signal_ema.period()
    }
}

impl<S: Sink<MacdValue>> TickReceiver for Macd<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        self.ticks_seen += 1;
        if self.ticks_seen > self.slow_period - self.fast_period {
            self.fast_ema.receive_tick(value, bar_index);
        }
        self.slow_ema.receive_tick(value, bar_index);

        let Some(slow) = self.slow_ema.sink_mut().take() else {
            return;
        };
        let Some(fast) = self.fast_ema.value() else {
            return;
        };
        let macd = fast - slow;

        self.signal_ema.receive_tick(macd, bar_index);
        if let Some(signal) = self.signal_ema.sink_mut().take() {
            let output = MacdValue {
                macd,
                signal,
                histogram: macd - signal,
            };
            self.core.update_with_new_value(output, bar_index);
        }
    }
}

impl_indicator!(Macd, MacdValue);
impl_price_source!(Macd, MacdValue);
