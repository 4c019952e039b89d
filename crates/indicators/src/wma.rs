use crate::{check_period, IndicatorCore, IndicatorError, PriceSource, Sink, TickReceiver};
use std::collections::VecDeque;

/// Weighted Moving Average (WMA).
///
/// Linear weights `1..=period` from oldest to newest tick, divided by
/// `period * (period + 1) / 2`.
#[derive(Debug, Clone)]
pub struct Wma<S = Vec<f64>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    period: usize,
    divisor: f64,
    window: VecDeque<f64>,
}

impl Wma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Wma<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        Ok(Self {
            core: IndicatorCore::new(period - 1, sink),
            source: PriceSource::default(),
            period,
            divisor: (period * (period + 1)) as f64 / 2.0,
            window: VecDeque::with_capacity(period + 1),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<S: Sink<f64>> TickReceiver for Wma<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        self.window.push_back(value);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        if self.window.len() < self.period {
            return;
        }

        let weighted: f64 = self
            .window
            .iter()
            .enumerate()
            .map(|(i, v)| (i + 1) as f64 * v)
            .sum();
        self.core
            .update_with_new_value(weighted / self.divisor, bar_index);
    }
}

impl_indicator!(Wma, f64);
impl_price_source!(Wma, f64);
