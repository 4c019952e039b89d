use crate::directional::{Direction, DirectionalMovement};
use crate::{Bar, BarReceiver, IndicatorCore, IndicatorError, Latest, Sink};
use serde::{Deserialize, Serialize};

/// Position the Parabolic SAR is currently tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SarTrend {
    /// Not enough bars yet to pick an initial direction.
    #[default]
    AwaitingDirection,
    Long,
    Short,
}

/// Parabolic Stop-And-Reverse (SAR).
///
/// The initial direction comes from the one-bar -DM of bar 2: a positive
/// downward move starts short, anything else starts long. From then on the
/// stop trails the extreme point with an acceleration factor that grows by
/// `acceleration` on every new extreme, capped at `maximum`. A stop that is
/// penetrated reverses the position. Lookback is 1.
#[derive(Debug, Clone)]
pub struct Sar<S = Vec<f64>> {
    core: IndicatorCore<S>,
    acceleration: f64,
    maximum: f64,
    minus_dm: DirectionalMovement<Latest<f64>>,
    trend: SarTrend,
    af: f64,
    extreme_point: f64,
    sar: f64,
    prev_high: f64,
    prev_low: f64,
}

impl Sar {
    pub fn new(acceleration: f64, maximum: f64) -> Result<Self, IndicatorError> {
        Self::with_sink(acceleration, maximum, Vec::new())
    }

    /// Classic Wilder parameters (0.02, 0.2).
    pub fn default_params() -> Result<Self, IndicatorError> {
        Self::new(0.02, 0.2)
    }
}

impl<S> Sar<S> {
    pub fn with_sink(acceleration: f64, maximum: f64, sink: S) -> Result<Self, IndicatorError> {
        if !(acceleration > 0.0 && acceleration <= 1.0) {
            return Err(IndicatorError::InvalidParameter {
                name: "acceleration",
                reason: format!("{acceleration} must be in (0, 1]"),
            });
        }
        if !(maximum >= acceleration && maximum <= 1.0) {
            return Err(IndicatorError::InvalidParameter {
                name: "maximum",
                reason: format!("{maximum} must be in [{acceleration}, 1]"),
            });
        }

        Ok(Self {
            core: IndicatorCore::new(1, sink),
            acceleration,
            maximum,
            minus_dm: DirectionalMovement::with_sink(Direction::Minus, 1, Latest::default())?,
            trend: SarTrend::AwaitingDirection,
            af: acceleration,
            extreme_point: 0.0,
            sar: 0.0,
            prev_high: 0.0,
            prev_low: 0.0,
        })
    }

    pub fn trend(&self) -> SarTrend {
        self.trend
    }

    pub fn acceleration_factor(&self) -> f64 {
        self.af
    }
}

impl<S: Sink<f64>> Sar<S> {
    fn step_long(&mut self, high: f64, low: f64, bar_index: usize) {
        if low <= self.sar {
            self.trend = SarTrend::Short;
            let reversal = self.extreme_point.max(self.prev_high).max(high);
            self.core.update_with_new_value(reversal, bar_index);

            self.af = self.acceleration;
            self.extreme_point = low;
            self.sar = reversal + self.af * (self.extreme_point - reversal);
            self.sar = self.sar.max(self.prev_high).max(high);
        } else {
            self.core.update_with_new_value(self.sar, bar_index);

            if high > self.extreme_point {
                self.extreme_point = high;
                self.af = (self.af + self.acceleration).min(self.maximum);
            }
            self.sar += self.af * (self.extreme_point - self.sar);
            self.sar = self.sar.min(self.prev_low).min(low);
        }
    }

    fn step_short(&mut self, high: f64, low: f64, bar_index: usize) {
        if high >= self.sar {
            self.trend = SarTrend::Long;
            let reversal = self.extreme_point.min(self.prev_low).min(low);
            self.core.update_with_new_value(reversal, bar_index);

            self.af = self.acceleration;
            self.extreme_point = high;
            self.sar = reversal + self.af * (self.extreme_point - reversal);
            self.sar = self.sar.min(self.prev_low).min(low);
        } else {
            self.core.update_with_new_value(self.sar, bar_index);

            if low < self.extreme_point {
                self.extreme_point = low;
                self.af = (self.af + self.acceleration).min(self.maximum);
            }
            self.sar += self.af * (self.extreme_point - self.sar);
            self.sar = self.sar.max(self.prev_high).max(high);
        }
    }
}

impl<S: Sink<f64>> BarReceiver for Sar<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        let (high, low) = (bar.high(), bar.low());

        if self.trend == SarTrend::AwaitingDirection {
            self.minus_dm.receive_bar(bar, bar_index);
            let Some(minus_dm) = self.minus_dm.sink_mut().take() else {
                self.prev_high = high;
                self.prev_low = low;
                return;
            };
            if minus_dm > 0.0 {
                self.trend = SarTrend::Short;
                self.extreme_point = low;
                self.sar = self.prev_high;
            } else {
                self.trend = SarTrend::Long;
                self.extreme_point = high;
                self.sar = self.prev_low;
            }
            // The first step compares the bar against itself.
            self.prev_high = high;
            self.prev_low = low;
        }

        match self.trend {
            SarTrend::Long => self.step_long(high, low, bar_index),
            SarTrend::Short => self.step_short(high, low, bar_index),
            SarTrend::AwaitingDirection => {}
        }

        self.prev_high = high;
        self.prev_low = low;
    }
}

impl_indicator!(Sar, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use crate::Indicator;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_sar_starts_long_on_rising_bars() {
        let mut sar = Sar::default_params().unwrap();
        sar.receive_bar(&hlc(0, 10.0, 9.0, 9.5), 1);
        assert_eq!(sar.trend(), SarTrend::AwaitingDirection);
        assert!(sar.is_empty());

        sar.receive_bar(&hlc(1, 11.0, 10.0, 10.5), 2);
        assert_eq!(sar.trend(), SarTrend::Long);
        assert_eq!(sar.data(), &[9.0]);
        assert_eq!(sar.valid_from_bar(), Some(2));
        assert_eq!(sar.lookback_period(), 1);

        // sar = 9 + 0.02 * (11 - 9), clamped to the lows of bar 2
        sar.receive_bar(&hlc(2, 12.0, 11.0, 11.5), 3);
        assert_approx!(sar.data()[1], 9.04);
        assert_approx!(sar.acceleration_factor(), 0.04);
    }

    #[test]
    fn test_sar_starts_short_on_falling_bars() {
        let mut sar = Sar::default_params().unwrap();
        feed_bars(&mut sar, &[hlc(0, 10.0, 9.0, 9.5), hlc(1, 9.5, 8.0, 8.2)]);
        assert_eq!(sar.trend(), SarTrend::Short);
        assert_eq!(sar.data(), &[10.0]);
    }

    #[test]
    fn test_sar_reverses_when_penetrated() {
        let mut sar = Sar::default_params().unwrap();
        feed_bars(
            &mut sar,
            &[
                hlc(0, 10.0, 9.0, 9.5),
                hlc(1, 11.0, 10.0, 10.5),
                hlc(2, 12.0, 11.0, 11.5),
                hlc(3, 9.5, 8.0, 8.5),
            ],
        );
        assert_eq!(sar.trend(), SarTrend::Short);
        // reversal stop is the extreme point of the long run
        assert_eq!(sar.data()[2], 12.0);
        assert_approx!(sar.acceleration_factor(), 0.02);
    }

    #[test]
    fn test_sar_parameter_validation() {
        assert!(Sar::new(0.0, 0.2).is_err());
        assert!(Sar::new(0.3, 0.2).is_err());
        assert!(Sar::new(0.02, 1.5).is_err());
        assert!(Sar::new(f64::NAN, 0.2).is_err());
        assert!(Sar::new(0.2, 0.2).is_ok());
    }

    fn random_walk(steps: &[(i8, u8, u8)]) -> Vec<Bar> {
        let mut close = 1_000.0;
        steps
            .iter()
            .enumerate()
            .map(|(i, (step, up, down))| {
                let open = close;
                close += *step as f64 / 4.0;
                let high = open.max(close) + *up as f64 / 16.0;
                let low = open.min(close) - *down as f64 / 16.0;
                hlc(i, high, low, close)
            })
            .collect()
    }

    #[quickcheck]
    fn prop_sar_never_inside_the_bar_it_stops(steps: Vec<(i8, u8, u8)>) -> bool {
        let bars = random_walk(&steps);
        let mut sar = Sar::default_params().unwrap();

        for (i, bar) in bars.iter().enumerate() {
            let t = i + 1;
            let before = sar.trend();
            let emitted_before = sar.len();
            sar.receive_bar(bar, t);
            let after = sar.trend();
            if sar.len() == emitted_before || t < 3 || before == SarTrend::AwaitingDirection {
                continue;
            }
            let Some(value) = sar.data().last().copied() else {
                return false;
            };

            let ok = match (before, after) {
                (SarTrend::Long, SarTrend::Long) => {
                    value < bar.low()
                        && value <= bars[i - 1].low()
                        && (t < 4 || value <= bars[i - 2].low())
                }
                (SarTrend::Short, SarTrend::Short) => {
                    value > bar.high()
                        && value >= bars[i - 1].high()
                        && (t < 4 || value >= bars[i - 2].high())
                }
                (SarTrend::Long, SarTrend::Short) => value >= bar.high(),
                (SarTrend::Short, SarTrend::Long) => value <= bar.low(),
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }

    #[test]
    fn test_sar_stops_feeding_direction_seed() {
        let mut sar = Sar::default_params().unwrap();
        feed_bars(
            &mut sar,
            &[
                hlc(0, 10.0, 9.0, 9.5),
                hlc(1, 11.0, 10.0, 10.5),
                hlc(2, 12.0, 11.0, 11.5),
                hlc(3, 11.5, 10.5, 11.0),
            ],
        );
        assert_eq!(sar.trend(), SarTrend::Long);
        assert_eq!(sar.minus_dm.len(), 1);
        assert_eq!(sar.len(), 3);
    }
}
