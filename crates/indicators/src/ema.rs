use crate::{check_period, IndicatorCore, IndicatorError, PriceSource, Sink, TickReceiver};

/// Exponential Moving Average (EMA).
///
/// Seeded with the simple mean of the first `period` ticks, then smoothed with
/// `k = 2 / (period + 1)`. Lookback is `period - 1`.
#[derive(Debug, Clone)]
pub struct Ema<S = Vec<f64>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    period: usize,
    multiplier: f64,
    current: Option<f64>,
    count: usize,
    /// Accumulates values for the initial SMA seed.
    seed_sum: f64,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Ema<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        Ok(Self {
            core: IndicatorCore::new(period - 1, sink),
            source: PriceSource::default(),
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            current: None,
            count: 0,
            seed_sum: 0.0,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Most recent EMA value.
    pub fn value(&self) -> Option<f64> {
        self.current
    }
}

impl<S: Sink<f64>> TickReceiver for Ema<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        let next = match self.current {
            None => {
                self.count += 1;
                self.seed_sum += value;
                if self.count < self.period {
                    return;
                }
                self.seed_sum / self.period as f64
            }
            Some(prev) => (value - prev) * self.multiplier + prev,
        };

        self.current = Some(next);
        self.core.update_with_new_value(next, bar_index);
    }
}

impl_indicator!(Ema, f64);
impl_price_source!(Ema, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use crate::Indicator;

    #[test]
    fn test_ema_seed_then_smooth() {
        let mut ema = Ema::new(3).unwrap();
        feed_ticks(&mut ema, &[5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(ema.data(), &[6.0, 7.0, 8.0]);
        assert_eq!(ema.valid_from_bar(), Some(3));
        assert_eq!(ema.lookback_period(), 2);
    }

    #[test]
    fn test_ema_recurrence() {
        let mut ema = Ema::new(4).unwrap();
        feed_ticks(&mut ema, &[2.0, 4.0, 6.0, 8.0, 20.0]);
        let k = 2.0 / 5.0;
        assert_approx!(ema.data()[0], 5.0);
        assert_approx!(ema.data()[1], (20.0 - 5.0) * k + 5.0);
    }

    #[test]
    fn test_ema_needs_period_two() {
        assert!(Ema::new(1).is_err());
        assert!(Ema::new(2).is_ok());
    }

    #[test]
    fn test_ema_not_ready_before_period() {
        let mut ema = Ema::new(5).unwrap();
        feed_ticks(&mut ema, &[1.0, 2.0, 3.0, 4.0]);
        assert!(ema.is_empty());
        assert_eq!(ema.value(), None);
        assert_eq!(ema.min_value(), None);
    }
}
