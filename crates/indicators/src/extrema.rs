use crate::{check_period, IndicatorCore, IndicatorError, PriceSource, Sink, TickReceiver};
use std::collections::VecDeque;

/// Rolling extreme over the last `period` values.
///
/// Keeps the current extreme and how many ticks ago it arrived; the window is
/// only rescanned once that value slides out.
#[derive(Debug, Clone)]
struct ExtremeWindow {
    period: usize,
    window: VecDeque<f64>,
    extreme: f64,
    age: usize,
    /// `true` when the first argument should replace the second.
    beats: fn(f64, f64) -> bool,
}

impl ExtremeWindow {
    fn new(period: usize, beats: fn(f64, f64) -> bool) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            extreme: f64::NAN,
            age: 0,
            beats,
        }
    }

    fn push(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        if self.window.len() > self.period {
            self.window.pop_front();
        }

        if self.window.len() == 1 || value == self.extreme || (self.beats)(value, self.extreme) {
            self.extreme = value;
            self.age = 0;
        } else {
            self.age += 1;
            if self.age >= self.period {
                self.rescan();
            }
        }

        (self.window.len() == self.period).then_some(self.extreme)
    }

    fn rescan(&mut self) {
        let newest = self.window.len() - 1;
        let mut best = newest;
        for i in (0..newest).rev() {
            if (self.beats)(self.window[i], self.window[best]) {
                best = i;
            }
        }
        self.extreme = self.window[best];
        self.age = newest - best;
    }
}

macro_rules! extreme_indicator {
    ($(#[$doc:meta])* $name:ident, $beats:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name<S = Vec<f64>> {
            core: IndicatorCore<S>,
            source: PriceSource,
            tracker: ExtremeWindow,
        }

        impl $name {
            pub fn new(period: usize) -> Result<Self, IndicatorError> {
                Self::with_sink(period, Vec::new())
            }
        }

        impl<S> $name<S> {
            pub fn with_sink(period: usize, sink: S) -> Result<Self, IndicatorError> {
                let period = check_period("timePeriod", period, 1)?;
                Ok(Self {
                    core: IndicatorCore::new(period - 1, sink),
                    source: PriceSource::default(),
                    tracker: ExtremeWindow::new(period, $beats),
                })
            }

            pub fn period(&self) -> usize {
                self.tracker.period
            }
        }

        impl<S: Sink<f64>> TickReceiver for $name<S> {
            fn receive_tick(&mut self, value: f64, bar_index: usize) {
                if let Some(extreme) = self.tracker.push(value) {
                    self.core.update_with_new_value(extreme, bar_index);
                }
            }
        }

        impl_indicator!($name, f64);
        impl_price_source!($name, f64);
    };
}

extreme_indicator!(
    /// Highest value over the last `period` ticks.
    Highest,
    |a: f64, b: f64| a > b
);

extreme_indicator!(
    /// Lowest value over the last `period` ticks.
    Lowest,
    |a: f64, b: f64| a < b
);
