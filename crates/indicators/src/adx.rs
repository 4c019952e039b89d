use crate::directional::{Direction, DirectionalIndicator};
use crate::{check_period, Bar, BarReceiver, IndicatorCore, IndicatorError, Latest, Sink};
use std::collections::VecDeque;

/// Directional Movement Index (DX).
///
/// `100 * |+DI - -DI| / (+DI + -DI)`, or 0 when both are zero. Lookback is
/// `period`.
#[derive(Debug, Clone)]
pub struct Dx<S = Vec<f64>> {
    core: IndicatorCore<S>,
    period: usize,
    minus_di: DirectionalIndicator<Latest<f64>>,
    plus_di: DirectionalIndicator<Latest<f64>>,
}

impl Dx {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Dx<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 1)?;
        Ok(Self {
            core: IndicatorCore::new(period, sink),
            period,
            minus_di: DirectionalIndicator::with_sink(Direction::Minus, period, Latest::default())?,
            plus_di: DirectionalIndicator::with_sink(Direction::Plus, period, Latest::default())?,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<S: Sink<f64>> BarReceiver for Dx<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        self.minus_di.receive_bar(bar, bar_index);
        self.plus_di.receive_bar(bar, bar_index);

        let minus = self.minus_di.sink_mut().take();
        let plus = self.plus_di.sink_mut().take();
        if let (Some(plus), Some(minus)) = (plus, minus) {
            let sum = plus + minus;
            let dx = if sum == 0.0 {
                0.0
            } else {
                100.0 * (plus - minus).abs() / sum
            };
            self.core.update_with_new_value(dx, bar_index);
        }
    }
}

impl_indicator!(Dx, f64);

/// Average Directional Movement Index (ADX).
///
/// Mean of the first `period` DX values, then Wilder's smoothing.
/// Lookback is `2 * period - 1`.
#[derive(Debug, Clone)]
pub struct Adx<S = Vec<f64>> {
    core: IndicatorCore<S>,
    period: usize,
    dx: Dx<Latest<f64>>,
    count: usize,
    seed_sum: f64,
    current: Option<f64>,
}

impl Adx {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Adx<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        Ok(Self {
            core: IndicatorCore::new(2 * period - 1, sink),
            period,
            dx: Dx::with_sink(period, Latest::default())?,
            count: 0,
            seed_sum: 0.0,
            current: None,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<S: Sink<f64>> BarReceiver for Adx<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        self.dx.receive_bar(bar, bar_index);
        let Some(dx) = self.dx.sink_mut().take() else {
            return;
        };

        let next = match self.current {
            None => {
                self.count += 1;
                self.seed_sum += dx;
                if self.count < self.period {
                    return;
                }
                self.seed_sum / self.period as f64
            }
            Some(prev) => (prev * (self.period - 1) as f64 + dx) / self.period as f64,
        };
        self.current = Some(next);
        self.core.update_with_new_value(next, bar_index);
    }
}

impl_indicator!(Adx, f64);

/// Average Directional Movement Index Rating (ADXR).
///
/// Average of the current ADX and the ADX from `period - 1` bars earlier.
/// Lookback is `3 * period - 2`.
#[derive(Debug, Clone)]
pub struct Adxr<S = Vec<f64>> {
    core: IndicatorCore<S>,
    period: usize,
    adx: Adx<Latest<f64>>,
    history: VecDeque<f64>,
}

impl Adxr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Adxr<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        Ok(Self {
            core: IndicatorCore::new(3 * period - 2, sink),
            period,
            adx: Adx::with_sink(period, Latest::default())?,
            history: VecDeque::with_capacity(period),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<S: Sink<f64>> BarReceiver for Adxr<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        self.adx.receive_bar(bar, bar_index);
        let Some(adx) = self.adx.sink_mut().take() else {
            return;
        };

        self.history.push_back(adx);
        if self.history.len() == self.period {
            if let Some(earlier) = self.history.pop_front() {
                self.core
                    .update_with_new_value((adx + earlier) / 2.0, bar_index);
            }
        }
    }
}

impl_indicator!(Adxr, f64);
