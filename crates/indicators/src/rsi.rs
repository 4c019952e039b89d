use crate::{check_period, IndicatorCore, IndicatorError, PriceSource, Sink, TickReceiver};

/// Relative Strength Index (RSI).
/// Uses Wilder's smoothing for average gain/loss. Lookback is `period`.
#[derive(Debug, Clone)]
pub struct Rsi<S = Vec<f64>> {
    core: IndicatorCore<S>,
    source: PriceSource,
    period: usize,
    prev_value: Option<f64>,
    count: usize,
    gain_sum: f64,
    loss_sum: f64,
    /// Smoothed `(gain, loss)` once the first `period` changes are in.
    averages: Option<(f64, f64)>,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Self::with_sink(period, Vec::new())
    }
}

impl<S> Rsi<S> {
    pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
        let period = check_period("timePeriod", period, 2)?;
        Ok(Self {
            core: IndicatorCore::new(period, sink),
            source: PriceSource::default(),
            period,
            prev_value: None,
            count: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            averages: None,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

fn strength(gain: f64, loss: f64) -> f64 {
    let total = gain + loss;
    if total == 0.0 {
        0.0
    } else {
        100.0 * gain / total
    }
}

impl<S: Sink<f64>> TickReceiver for Rsi<S> {
    fn receive_tick(&mut self, value: f64, bar_index: usize) {
        let Some(prev) = self.prev_value.replace(value) else {
            return;
        };
        let change = value - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = self.period as f64;

        let (avg_gain, avg_loss) = match self.averages {
            None => {
                self.count += 1;
                self.gain_sum += gain;
                self.loss_sum += loss;
                if self.count < self.period {
                    return;
                }
                (self.gain_sum / n, self.loss_sum / n)
            }
            Some((prev_gain, prev_loss)) => (
                (prev_gain * (n - 1.0) + gain) / n,
                (prev_loss * (n - 1.0) + loss) / n,
            ),
        };

        self.averages = Some((avg_gain, avg_loss));
        self.core
            .update_with_new_value(strength(avg_gain, avg_loss), bar_index);
    }
}

impl_indicator!(Rsi, f64);
impl_price_source!(Rsi, f64);
