use crate::extrema::{Highest, Lowest};
use crate::rsi::Rsi;
use crate::sma::Sma;
use crate::{
    check_period, Bounded, IndicatorCore, IndicatorError, Latest, PriceSource, Sink, TickReceiver,
};
use serde::{Deserialize, Serialize};

/// Stochastic oscillator output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochValue {
    pub k: f64,
    pub d: f64,
}

impl Bounded for StochValue {
    fn extremes(&self) -> (f64, f64) {
        (self.k.min(self.d), self.k.max(self.d))
    }
}

/// Stochastic RSI.
///
/// Fast %K places the current RSI inside its `fast_k_period` range, fast %D
/// is a simple average of %K. Lookback is
/// `period + fast_k_period + fast_d_period - 2`.
#[derive(Debug, Clone)]
pub struct StochRsi<S = Vec<StochValue>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    rsi: Rsi<Latest<f64>>,
    highest: Highest<Latest<f64>>,
    lowest: Lowest<Latest<f64>>,
    fast_d: Sma<Latest<f64>>,
}

impl StochRsi {
    pub fn new(
        period: usize,
        fast_k_period: usize,
        fast_d_period: usize,
    ) -> Result<Self, IndicatorError> {
        Self::with_sink(period, fast_k_period, fast_d_period, Vec::new())
    }
}

impl<S> StochRsi<S> {
    pub fn with_sink(
        period: usize,
        fast_k_period: usize,
        fast_d_period: usize,
        sink: S,
    ) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        let fast_k_period = check_period("fastKPeriod", fast_k_period, 1)?;
        let fast_d_period = check_period("fastDPeriod", fast_d_period, 1)?;
        Ok(Self {
            core: IndicatorCore::new(period + fast_k_period + fast_d_period - 2, sink),
            source: PriceSource::default(),
            rsi: Rsi::with_sink(period, Latest::default())?,
            highest: Highest::with_sink(fast_k_period, Latest::default())?,
            lowest: Lowest::with_sink(fast_k_period, Latest::default())?,
            fast_d: Sma::with_sink(fast_d_period, Latest::default())?,
        })
    }
}

impl<S: Sink<StochValue>> TickReceiver for StochRsi<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        self.rsi.receive_tick(value, bar_index);
        let Some(rsi) = self.rsi.sink_mut().take() else {
            return;
        };

        self.highest.receive_tick(rsi, bar_index);
        self.lowest.receive_tick(rsi, bar_index);
        let high = self.highest.sink_mut().take();
        let low = self.lowest.sink_mut().take();
        let (Some(high), Some(low)) = (high, low) else {
            return;
        };

        let range = high - low;
        let k = if range == 0.0 {
            0.0
        } else {
            100.0 * (rsi - low) / range
        };

        self.fast_d.receive_tick(k, bar_index);
        if let Some(d) = self.fast_d.sink_mut().take() {
            self.core.update_with_new_value(StochValue { k, d }, bar_index);
        }
    }
}

impl_indicator!(StochRsi, StochValue);
impl_price_source!(StochRsi, StochValue);
