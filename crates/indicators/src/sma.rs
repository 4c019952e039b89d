use crate::{check_period, IndicatorCore, IndicatorError, PriceSource, Sink, TickReceiver};
use std::collections::VecDeque;

/// Simple Moving Average (SMA).
///
/// Arithmetic mean of the last `period` ticks. Lookback is `period - 1`.
#[derive(Debug, Clone)]
pub struct Sma<S = Vec<f64>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Sma<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 1)?;
        Ok(Self {
            core: IndicatorCore::new(period - 1, sink),
            source: PriceSource::default(),
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<S: Sink<f64>> TickReceiver for Sma<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        self.sum += value;
        self.window.push_back(value);

        if self.window.len() > self.period {
            if let Some(removed) = self.window.pop_front() {
                self.sum -= removed;
            }
        }

        if self.window.len() == self.period {
            let mean = self.sum / self.period as f64;
            self.core.update_with_new_value(mean, bar_index);
        }
    }
}

impl_indicator!(Sma, f64);
impl_price_source!(Sma, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use crate::{Indicator, Latest};
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_sma_basic() {
        let mut sma = Sma::new(3).unwrap();
        feed_ticks(&mut sma, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sma.data(), &[2.0, 3.0, 4.0]);
        assert_eq!(sma.lookback_period(), 2);
        assert_eq!(sma.valid_from_bar(), Some(3));
        assert_eq!(sma.min_value(), Some(2.0));
        assert_eq!(sma.max_value(), Some(4.0));
    }

    #[test]
    fn test_sma_period_one_echoes_input() {
        let mut sma = Sma::new(1).unwrap();
        feed_ticks(&mut sma, &[4.0, -2.0]);
        assert_eq!(sma.data(), &[4.0, -2.0]);
        assert_eq!(sma.valid_from_bar(), Some(1));
    }

    #[test]
    fn test_sma_rejects_bad_period() {
        assert!(matches!(
            Sma::new(0),
            Err(IndicatorError::PeriodOutOfRange { value: 0, .. })
        ));
        assert!(Sma::new(crate::MAXIMUM_PERIOD + 1).is_err());
    }

    #[test]
    fn test_sma_reads_configured_source() {
        let mut sma = Sma::new(2).unwrap().with_source(PriceSource::High);
        let bars = [hlc(0, 10.0, 1.0, 5.0), hlc(1, 20.0, 2.0, 6.0)];
        feed_bars(&mut sma, &bars);
        assert_eq!(sma.data(), &[15.0]);
    }

    #[test]
    fn test_sma_into_latest_sink() {
        let mut sma = Sma::with_sink(2, Latest::<f64>::default()).unwrap();
        sma.receive_tick(1.0, 1);
        assert_eq!(sma.sink_mut().take(), None);
        sma.receive_tick(3.0, 2);
        assert_eq!(sma.sink_mut().take(), Some(2.0));
        assert_eq!(sma.sink().bar_index(), Some(2));
    }

    #[quickcheck]
    fn prop_sma_output_count(values: Vec<i16>, period: u8) -> bool {
        let period = (period as usize % 20) + 1;
        let ticks: Vec<f64> = values.iter().map(|v| *v as f64).collect();
        let mut sma = Sma::new(period).unwrap();
        feed_ticks(&mut sma, &ticks);
        sma.len() == ticks.len().saturating_sub(period - 1)
            && sma.data().len() == sma.len()
    }

    #[test]
    fn test_sma_matches_window_mean() {
        let ticks = closes(&sample_bars(60));
        let mut sma = Sma::new(7).unwrap();
        feed_ticks(&mut sma, &ticks);
        for (i, value) in sma.data().iter().enumerate() {
            let expected = ticks[i..i + 7].iter().sum::<f64>() / 7.0;
            assert_approx!(*value, expected);
        }
    }

    #[test]
    fn test_sma_silent_until_window_full() {
        for period in 2..12 {
            let mut sma = Sma::new(period).unwrap();
            let ticks: Vec<f64> = (1..period).map(|i| i as f64).collect();
            feed_ticks(&mut sma, &ticks);
            assert_eq!((sma.len(), sma.valid_from_bar()), (0, None), "period {period}");
            assert_eq!(sma.min_value(), None);
        }
    }
}
