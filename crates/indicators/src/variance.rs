use crate::{check_period, IndicatorCore, IndicatorError, Latest, PriceSource, Sink, TickReceiver};
use std::collections::VecDeque;

/// Running mean and sum of squared deviations over the last `period` values.
///
/// Uses Welford's update while the window fills, then a replace-one update
/// when the oldest value is evicted, so no sum of squares is ever formed.
#[derive(Debug, Clone)]
pub(crate) struct WelfordWindow {
    period: usize,
    window: VecDeque<f64>,
    mean: f64,
    m2: f64,
}

impl WelfordWindow {
    pub(crate) fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
            mean: 0.0,
            m2: 0.0,
        }
    }

    pub(crate) fn push(&mut self, value: f64) {
        if self.window.len() < self.period {
            self.window.push_back(value);
            let delta = value - self.mean;
            self.mean += delta / self.window.len() as f64;
            self.m2 += delta * (value - self.mean);
            return;
        }

        let Some(evicted) = self.window.pop_front() else {
            return;
        };
        self.window.push_back(value);
        let delta = value - evicted;
        let old_dev = evicted - self.mean;
        self.mean += delta / self.period as f64;
        let new_dev = value - self.mean;
        self.m2 += (old_dev + new_dev) * delta;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.window.len() == self.period
    }

    pub(crate) fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance. Rounding residue below zero is clamped.
    pub(crate) fn variance(&self) -> f64 {
        self.m2.max(0.0) / self.window.len() as f64
    }
}

/// Population variance of the last `period` ticks.
#[derive(Debug, Clone)]
pub struct Variance<S = Vec<f64>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    stats: WelfordWindow,
}

impl Variance {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Variance<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 1)?;
        Ok(Self {
            core: IndicatorCore::new(period - 1, sink),
            source: PriceSource::default(),
            stats: WelfordWindow::new(period),
        })
    }

    pub fn period(&self) -> usize {
        self.stats.period
    }
}

impl<S: Sink<f64>> TickReceiver for Variance<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        self.stats.push(value);
        if self.stats.is_full() {
            let variance = self.stats.variance();
            self.core.update_with_new_value(variance, bar_index);
        }
    }
}

impl_indicator!(Variance, f64);
impl_price_source!(Variance, f64);

/// Population standard deviation: the square root of [`Variance`] over the
/// same window.
#[derive(Debug, Clone)]
pub struct StdDev<S = Vec<f64>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    variance: Variance<Latest<f64>>,
}

impl StdDev {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> StdDev<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        Ok(Self {
            core: IndicatorCore::new(period - 1, sink),
            source: PriceSource::default(),
            variance: Variance::with_sink(period, Latest::default())?,
        })
    }

    pub fn period(&self) -> usize {
        self.variance.period()
    }
}

impl<S: Sink<f64>> TickReceiver for StdDev<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        self.variance.receive_tick(value, bar_index);
        if let Some(variance) = self.variance.sink_mut().take() {
            self.core.update_with_new_value(variance.sqrt(), bar_index);
        }
    }
}

impl_indicator!(StdDev, f64);
impl_price_source!(StdDev, f64);
