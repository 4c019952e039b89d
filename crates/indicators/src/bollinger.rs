use crate::variance::WelfordWindow;
use crate::{check_period, Bounded, IndicatorCore, IndicatorError, PriceSource, Sink, TickReceiver};
use serde::{Deserialize, Serialize};

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandsValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BandsValue {
    pub fn bandwidth(&self) -> f64 {
        self.upper - self.lower
    }
}

impl Bounded for BandsValue {
    fn extremes(&self) -> (f64, f64) {
        (
            self.lower.min(self.middle).min(self.upper),
            self.upper.max(self.middle).max(self.lower),
        )
    }
}

/// Bollinger Bands.
///
/// Middle band is the mean of the last `period` ticks; the outer bands sit
/// `k_up` and `k_down` population standard deviations away from it.
#[derive(Debug, Clone)]
pub struct BollingerBands<S = Vec<BandsValue>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    k_up: f64,
    k_down: f64,
    stats: WelfordWindow,
}

impl BollingerBands {
    pub fn new(period: usize, k_up: f64, k_down: f64) -> Result<Self, IndicatorError> {
        Self::with_sink(period, k_up, k_down, Vec::new())
    }

    /// Standard Bollinger Bands (20, 2).
    pub fn default_periods() -> Result<Self, IndicatorError> {
        Self::new(20, 2.0, 2.0)
    }
}

impl<S> BollingerBands<S> {
    pub fn with_sink(
        period: usize,
        k_up: f64,
        k_down: f64,
        sink: S,
    ) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        for (name, k) in [("deviationsUp", k_up), ("deviationsDown", k_down)] {
            if !k.is_finite() {
                return Err(IndicatorError::InvalidParameter {
                    name,
                    reason: format!("{k} is not a finite multiplier"),
                });
            }
        }
        Ok(Self {
            core: IndicatorCore::new(period - 1, sink),
            source: PriceSource::default(),
            k_up,
            k_down,
            stats: WelfordWindow::new(period),
        })
    }
}

impl<S: Sink<BandsValue>> TickReceiver for BollingerBands<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        self.stats.push(value);
        if !self.stats.is_full() {
            return;
        }

        let middle = self.stats.mean();
        let sd = self.stats.variance().sqrt();
        let bands = BandsValue {
            upper: middle + self.k_up * sd,
            middle,
            lower: middle - self.k_down * sd,
        };
        self.core.update_with_new_value(bands, bar_index);
    }
}

impl_indicator!(BollingerBands, BandsValue);
impl_price_source!(BollingerBands, BandsValue);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use crate::Indicator;

    #[test]
    fn test_bollinger_constant_input_collapses() {
        let mut bb = BollingerBands::new(5, 2.0, 2.0).unwrap();
        feed_ticks(&mut bb, &[10.0; 8]);
        assert_eq!(bb.len(), 4);
        for v in bb.data() {
            assert_approx!(v.upper, 10.0);
            assert_approx!(v.middle, 10.0);
            assert_approx!(v.lower, 10.0);
        }
    }

    #[test]
    fn test_bollinger_bands_around_mean() {
        let mut bb = BollingerBands::new(4, 2.0, 1.0).unwrap();
        feed_ticks(&mut bb, &[2.0, 4.0, 4.0, 4.0]);
        let v = bb.data()[0];
        let sd = 0.75_f64.sqrt();
        assert_approx!(v.middle, 3.5);
        assert_approx!(v.upper, 3.5 + 2.0 * sd);
        assert_approx!(v.lower, 3.5 - sd);
        assert_approx!(v.bandwidth(), 3.0 * sd);
        assert_eq!(bb.valid_from_bar(), Some(4));
    }

    #[test]
    fn test_bollinger_bounds_span_both_bands() {
        let mut bb = BollingerBands::default_periods().unwrap();
        feed_ticks(&mut bb, &closes(&sample_bars(100)));
        let lowest = bb.data().iter().map(|v| v.lower).fold(f64::INFINITY, f64::min);
        let highest = bb.data().iter().map(|v| v.upper).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(bb.min_value(), Some(lowest));
        assert_eq!(bb.max_value(), Some(highest));
    }

    #[test]
    fn test_bollinger_rejects_nan_multiplier() {
        assert!(matches!(
            BollingerBands::new(20, f64::NAN, 2.0),
            Err(IndicatorError::InvalidParameter { name: "deviationsUp", .. })
        ));
    }
}
