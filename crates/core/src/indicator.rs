use crate::traits::*;

/// Shared bookkeeping held by every indicator: lookback depth, result count,
/// first valid bar and the running bounds of everything emitted.
///
/// [`update_with_new_value`](IndicatorCore::update_with_new_value) is the only
/// way any of these change. It also hands the value to the indicator's sink.
#[derive(Debug, Clone)]
pub struct IndicatorCore<S> {
    lookback_period: usize,
    result_count: usize,
    valid_from_bar: Option<usize>,
    min_value: f64,
    max_value: f64,
    sink: S,
}

impl<S> IndicatorCore<S> {
    pub fn new(lookback_period: usize, sink: S) -> Self {
        Self {
            lookback_period,
            result_count: 0,
            valid_from_bar: None,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
            sink,
        }
    }

    /// Record a new result for `bar_index` and deliver it to the sink.
    pub fn update_with_new_value<T>(&mut self, value: T, bar_index: usize)
    where
        T: Bounded,
        S: Sink<T>,
    {
        self.result_count += 1;
        if self.valid_from_bar.is_none() {
            self.valid_from_bar = Some(bar_index);
        }

        let (low, high) = value.extremes();
        if low < self.min_value {
            self.min_value = low;
        }
        if high > self.max_value {
            self.max_value = high;
        }

        self.sink.accept(value, bar_index);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S> Indicator for IndicatorCore<S> {
    fn lookback_period(&self) -> usize {
        self.lookback_period
    }

    fn len(&self) -> usize {
        self.result_count
    }

    fn valid_from_bar(&self) -> Option<usize> {
        self.valid_from_bar
    }

    fn min_value(&self) -> Option<f64> {
        (self.result_count > 0).then_some(self.min_value)
    }

    fn max_value(&self) -> Option<f64> {
        (self.result_count > 0).then_some(self.max_value)
    }
}

/// Single-slot sink a composite indicator hands to each child it owns.
///
/// The parent feeds the child, then drains the slot with [`take`](Latest::take)
/// to learn whether the child produced a value on that call.
#[derive(Debug, Clone)]
pub struct Latest<T> {
    value: Option<T>,
    bar_index: Option<usize>,
    fresh: bool,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self {
            value: None,
            bar_index: None,
            fresh: false,
        }
    }
}

impl<T: Copy> Latest<T> {
    /// Most recent value, fresh or not.
    pub fn value(&self) -> Option<T> {
        self.value
    }

    /// Bar index the most recent value was produced for.
    pub fn bar_index(&self) -> Option<usize> {
        self.bar_index
    }

    /// The value delivered since the last `take`, if any.
    pub fn take(&mut self) -> Option<T> {
        if std::mem::take(&mut self.fresh) {
            self.value
        } else {
            None
        }
    }
}

impl<T> Sink<T> for Latest<T> {
    fn accept(&mut self, value: T, bar_index: usize) {
        self.value = Some(value);
        self.bar_index = Some(bar_index);
        self.fresh = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_core_has_no_results() {
        let core: IndicatorCore<Vec<f64>> = IndicatorCore::new(3, Vec::new());
        assert_eq!(core.lookback_period(), 3);
        assert_eq!(core.len(), 0);
        assert!(core.is_empty());
        assert_eq!(core.valid_from_bar(), None);
        assert_eq!(core.min_value(), None);
        assert_eq!(core.max_value(), None);
    }

    #[test]
    fn test_update_tracks_bounds_and_first_bar() {
        let mut core = IndicatorCore::new(1, Vec::new());
        core.update_with_new_value(5.0, 2);
        core.update_with_new_value(-1.0, 3);
        core.update_with_new_value(9.0, 4);

        assert_eq!(core.len(), 3);
        assert_eq!(core.valid_from_bar(), Some(2));
        assert_eq!(core.min_value(), Some(-1.0));
        assert_eq!(core.max_value(), Some(9.0));
        assert_eq!(core.sink(), &vec![5.0, -1.0, 9.0]);
    }

    #[test]
    fn test_valid_from_bar_never_moves() {
        let mut core = IndicatorCore::new(0, Latest::<f64>::default());
        core.update_with_new_value(1.0, 10);
        core.update_with_new_value(1.0, 11);
        assert_eq!(core.valid_from_bar(), Some(10));
    }

    #[test]
    fn test_latest_take_drains_once() {
        let mut slot: Latest<f64> = Latest::default();
        assert_eq!(slot.take(), None);
        slot.accept(4.0, 7);
        assert_eq!(slot.take(), Some(4.0));
        assert_eq!(slot.take(), None);
        assert_eq!(slot.value(), Some(4.0));
        assert_eq!(slot.bar_index(), Some(7));
    }
}
