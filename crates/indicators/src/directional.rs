use crate::true_range::TrueRange;
use crate::{check_period, Bar, BarReceiver, IndicatorCore, IndicatorError, Latest, Sink};
use serde::{Deserialize, Serialize};

/// Which side of the bar-to-bar range expansion is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Upward expansion, `high - prev_high`.
    Plus,
    /// Downward expansion, `prev_low - low`.
    Minus,
}

impl Direction {
    /// One-bar directional movement. Only the dominant, strictly positive side
    /// counts; the other side is zero.
    pub(crate) fn movement(self, bar: &Bar, prev_high: f64, prev_low: f64) -> f64 {
        let up = bar.high() - prev_high;
        let down = prev_low - bar.low();
        let (this, other) = match self {
            Self::Plus => (up, down),
            Self::Minus => (down, up),
        };
        if this > 0.0 && this > other {
            this
        } else {
            0.0
        }
    }
}

fn wilder(prev: f64, value: f64, period: usize) -> f64 {
    prev - prev / period as f64 + value
}

/// Directional Movement (+DM / -DM).
///
/// With `period == 1` the raw one-bar movement is emitted from bar 2. Longer
/// periods sum the first `period - 1` movements and then apply Wilder's
/// smoothing, `prev - prev / period + dm`.
#[derive(Debug, Clone)]
pub struct DirectionalMovement<S = Vec<f64>> {
    core: IndicatorCore<S>,
    direction: Direction,
    period: usize,
    prev_range: Option<(f64, f64)>,
    count: usize,
    seed_sum: f64,
    current: Option<f64>,
}

impl DirectionalMovement {
    pub fn new(direction: Direction, period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(direction, period, Vec::new())
    }

    pub fn plus(period: usize) -> Result<Self, IndicatorError> {
        Self::new(Direction::Plus, period)
    }

    pub fn minus(period: usize) -> Result<Self, IndicatorError> {
        Self::new(Direction::Minus, period)
    }
}

impl<S> DirectionalMovement<S> {
    pub fn with_sink(direction: Direction, period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 1)?;
        let lookback = if period == 1 { 1 } else { period - 1 };
        Ok(Self {
            core: IndicatorCore::new(lookback, sink),
            direction,
            period,
            prev_range: None,
            count: 0,
            seed_sum: 0.0,
            current: None,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<S: Sink<f64>> BarReceiver for DirectionalMovement<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        let prev_range = self.prev_range.replace((bar.high(), bar.low()));
        let Some((prev_high, prev_low)) = prev_range else {
            return;
        };
        let dm = self.direction.movement(bar, prev_high, prev_low);

        if self.period == 1 {
            self.core.update_with_new_value(dm, bar_index);
            return;
        }

        let next = match self.current {
            None => {
                self.count += 1;
                self.seed_sum += dm;
                if self.count < self.period - 1 {
                    return;
                }
                self.seed_sum
            }
            Some(prev) => wilder(prev, dm, self.period),
        };
        self.current = Some(next);
        self.core.update_with_new_value(next, bar_index);
    }
}

impl_indicator!(DirectionalMovement, f64);

/// Directional Indicator (+DI / -DI).
///
/// Smoothed directional movement as a percentage of smoothed true range.
/// With `period == 1` the unsmoothed ratio `dm / tr` is emitted instead.
/// A zero true range yields 0.
#[derive(Debug, Clone)]
pub struct DirectionalIndicator<S = Vec<f64>> {
    core: IndicatorCore<S>,
    direction: Direction,
    period: usize,
    true_range: TrueRange<Latest<f64>>,
    prev_range: Option<(f64, f64)>,
    count: usize,
    dm_sum: f64,
    tr_sum: f64,
    /// Smoothed `(dm, tr)` once the seed window is complete.
    smoothed: Option<(f64, f64)>,
}

impl DirectionalIndicator {
    pub fn new(direction: Direction, period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(direction, period, Vec::new())
    }

    pub fn plus(period: usize) -> Result<Self, IndicatorError> {
        Self::new(Direction::Plus, period)
    }

    pub fn minus(period: usize) -> Result<Self, IndicatorError> {
        Self::new(Direction::Minus, period)
    }
}

impl<S> DirectionalIndicator<S> {
    pub fn with_sink(direction: Direction, period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 1)?;
        Ok(Self {
            core: IndicatorCore::new(period, sink),
            direction,
            period,
            true_range: TrueRange::with_sink(Latest::default()),
            prev_range: None,
            count: 0,
            dm_sum: 0.0,
            tr_sum: 0.0,
            smoothed: None,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

fn ratio(dm: f64, tr: f64) -> f64 {
    if tr == 0.0 {
        0.0
    } else {
        dm / tr
    }
}

impl<S: Sink<f64>> BarReceiver for DirectionalIndicator<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        self.true_range.receive_bar(bar, bar_index);
        let tr = self.true_range.sink_mut().take();
        let prev_range = self.prev_range.replace((bar.high(), bar.low()));
        let (Some((prev_high, prev_low)), Some(tr)) = (prev_range, tr) else {
            return;
        };
        let dm = self.direction.movement(bar, prev_high, prev_low);

        if self.period == 1 {
            self.core.update_with_new_value(ratio(dm, tr), bar_index);
            return;
        }

        match self.smoothed {
            None => {
                self.count += 1;
                self.dm_sum += dm;
                self.tr_sum += tr;
                if self.count == self.period - 1 {
                    self.smoothed = Some((self.dm_sum, self.tr_sum));
                }
            }
            Some((prev_dm, prev_tr)) => {
                let dm = wilder(prev_dm, dm, self.period);
                let tr = wilder(prev_tr, tr, self.period);
                self.smoothed = Some((dm, tr));
                self.core
                    .update_with_new_value(100.0 * ratio(dm, tr), bar_index);
            }
        }
    }
}

impl_indicator!(DirectionalIndicator, f64);
