use crate::true_range::TrueRange;
use crate::{check_period, Bar, BarReceiver, IndicatorCore, IndicatorError, Latest, Sink};

/// Average True Range (ATR).
///
/// Simple mean of the first `period` true ranges, then Wilder's smoothing.
/// The first true range appears on bar 2, so the lookback is `period`.
#[derive(Debug, Clone)]
pub struct Atr<S = Vec<f64>> {
    core: IndicatorCore<S>,
    period: usize,
    true_range: TrueRange<Latest<f64>>,
    current: Option<f64>,
    count: usize,
    seed_sum: f64,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Atr<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 1)?;
        Ok(Self {
            core: IndicatorCore::new(period, sink),
            period,
            true_range: TrueRange::with_sink(Latest::default()),
            current: None,
            count: 0,
            seed_sum: 0.0,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }
}

impl<S: Sink<f64>> BarReceiver for Atr<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        self.true_range.receive_bar(bar, bar_index);
        let Some(tr) = self.true_range.sink_mut().take() else {
            return;
        };

        let next = match self.current {
            None => {
                self.count += 1;
                self.seed_sum += tr;
                if self.count < self.period {
                    return;
                }
                self.seed_sum / self.period as f64
            }
            // Wilder's smoothing
            Some(prev) => (prev * (self.period - 1) as f64 + tr) / self.period as f64,
        };

        self.current = Some(next);
        self.core.update_with_new_value(next, bar_index);
    }
}

impl_indicator!(Atr, f64);
