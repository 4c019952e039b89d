//! Streaming technical indicators.
//!
//! Every indicator consumes one tick (or bar) at a time and hands each result
//! to its [`Sink`] the moment enough history has accumulated. `Name::new`
//! builds an indicator that stores its results in a `Vec` exposed through
//! `data()`; `Name::with_sink` delivers into any other sink, which is how
//! composite indicators chain their children.

pub use tickstream_core::{
    Bar, BarReceiver, Bounded, FnSink, Indicator, IndicatorCore, IndicatorError, Latest,
    PriceSource, Sink, TickReceiver,
};

/// Upper bound for every period parameter.
pub const MAXIMUM_PERIOD: usize = 100_000;

pub(crate) fn check_period(
    name: &'static str,
    value: usize,
    min: usize,
) -> Result<usize, IndicatorError> {
    if (min..=MAXIMUM_PERIOD).contains(&value) {
        Ok(value)
    } else {
        Err(IndicatorError::PeriodOutOfRange {
            name,
            value,
            min,
            max: MAXIMUM_PERIOD,
        })
    }
}

/// Delegates [`Indicator`] and the sink accessors to the `core` field, and adds
/// `data()` for the storage-backed variant.
macro_rules! impl_indicator {
    ($name:ident, $output:ty) => {
        impl<S> $crate::Indicator for $name<S> {
            fn lookback_period(&self) -> usize {
                $crate::Indicator::lookback_period(&self.core)
            }

            fn len(&self) -> usize {
                $crate::Indicator::len(&self.core)
            }

            fn valid_from_bar(&self) -> Option<usize> {
                $crate::Indicator::valid_from_bar(&self.core)
            }

            fn min_value(&self) -> Option<f64> {
                $crate::Indicator::min_value(&self.core)
            }

            fn max_value(&self) -> Option<f64> {
                $crate::Indicator::max_value(&self.core)
            }
        }

        impl<S> $name<S> {
            pub fn sink(&self) -> &S {
                self.core.sink()
            }

            pub fn sink_mut(&mut self) -> &mut S {
                self.core.sink_mut()
            }

            pub fn into_sink(self) -> S {
                self.core.into_sink()
            }
        }

        impl $name<Vec<$output>> {
            /// Stored results; element `i` belongs to bar `valid_from_bar() + i`.
            pub fn data(&self) -> &[$output] {
                self.core.sink()
            }
        }
    };
}

/// Bar entry point for single-input indicators: project the bar through the
/// configured [`PriceSource`] and forward it as a tick.
macro_rules! impl_price_source {
    ($name:ident, $output:ty) => {
        impl<S> $name<S> {
            /// Select which bar value is fed in when receiving whole bars.
            pub fn with_source(mut self, source: $crate::PriceSource) -> Self {
                self.source = source;
                self
            }

            pub fn source(&self) -> $crate::PriceSource {
                self.source
            }
        }

        impl<S: $crate::Sink<$output>> $crate::BarReceiver for $name<S> {
            fn receive_bar(&mut self, bar: &$crate::Bar, bar_index: usize) {
                let value = self.source.extract(bar);
                $crate::TickReceiver::receive_tick(self, value, bar_index);
            }
        }
    };
}

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod directional;
pub mod ema;
pub mod extrema;
pub mod macd;
pub mod rsi;
pub mod sar;
pub mod sma;
pub mod stoch_rsi;
pub mod true_range;
pub mod variance;
pub mod wma;

pub use adx::{Adx, Adxr, Dx};
pub use atr::Atr;
pub use bollinger::{BandsValue, BollingerBands};
pub use directional::{Direction, DirectionalIndicator, DirectionalMovement};
pub use ema::Ema;
pub use extrema::{Highest, Lowest};
pub use macd::{Macd, MacdValue};
pub use rsi::Rsi;
pub use sar::{Sar, SarTrend};
pub use sma::Sma;
pub use stoch_rsi::{StochRsi, StochValue};
pub use true_range::TrueRange;
pub use variance::{StdDev, Variance};
pub use wma::Wma;

#[cfg(test)]
mod test_util;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_period_bounds() {
        assert_eq!(check_period("timePeriod", 2, 2), Ok(2));
        assert_eq!(check_period("timePeriod", MAXIMUM_PERIOD, 1), Ok(MAXIMUM_PERIOD));
        assert!(matches!(
            check_period("timePeriod", 1, 2),
            Err(IndicatorError::PeriodOutOfRange { min: 2, value: 1, .. })
        ));
        assert!(check_period("timePeriod", MAXIMUM_PERIOD + 1, 1).is_err());
    }
}
