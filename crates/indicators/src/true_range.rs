use crate::{Bar, BarReceiver, IndicatorCore, Sink};

/// True Range.
///
/// `max(high, prev_close) - min(low, prev_close)`. The first bar only records
/// its close, so the lookback is 1.
#[derive(Debug, Clone)]
pub struct TrueRange<S = Vec<f64>> {
    core: IndicatorCore<S>,
    prev_close: Option<f64>,
}

impl TrueRange {
    pub fn new() -> Self {
        Self::with_sink(Vec::new())
    }
}

impl Default for TrueRange {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> TrueRange<S> {
    pub fn with_sink(sink: S) -> Self {
        Self {
            core: IndicatorCore::new(1, sink),
            prev_close: None,
        }
    }
}

impl<S: Sink<f64>> BarReceiver for TrueRange<S> {
    fn receive_bar(&mut self, bar: &Bar, bar_index: usize) {
        if let Some(prev_close) = self.prev_close {
            let tr = bar.high().max(prev_close) - bar.low().min(prev_close);
            self.core.update_with_new_value(tr, bar_index);
        }
        self.prev_close = Some(bar.close());
    }
}

impl_indicator!(TrueRange, f64);
