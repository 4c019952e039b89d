use chrono::{DateTime, Utc};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tickstream_core::{Bar, BarInterval, BarReceiver};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// A receiver the hub can hand to a worker task.
pub type SharedReceiver = Arc<Mutex<dyn BarReceiver + Send>>;

/// Handle returned when a receiver is attached to a [`BarStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A subscriber whose update for a bar did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFault {
    pub id: SubscriptionId,
    pub message: String,
}

impl std::fmt::Display for SubscriberFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

/// Errors raised by the bar stream hub.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Stream has not received any bars")]
    EmptyStream,
    #[error("{} subscriber(s) faulted on bar {bar_index} and were detached", .faults.len())]
    SubscriberFaulted {
        bar_index: usize,
        faults: Vec<SubscriberFault>,
    },
}

/// Ordered bar history plus the receivers every new bar is fanned out to.
///
/// Each bar is delivered to all subscribers concurrently, one task per
/// subscriber, and [`receive_bar`](BarStream::receive_bar) returns only once
/// every task has finished. Subscribers see bars in the same order but have
/// no ordering between each other within a bar.
pub struct BarStream {
    interval: BarInterval,
    history: Vec<Bar>,
    bar_index: usize,
    min_value: f64,
    max_value: f64,
    subscribers: Vec<(SubscriptionId, SharedReceiver)>,
}

impl BarStream {
    pub fn new(interval: BarInterval) -> Self {
        Self {
            interval,
            history: Vec::new(),
            bar_index: 0,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
            subscribers: Vec::new(),
        }
    }

    pub fn daily() -> Self {
        Self::new(BarInterval::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(BarInterval::Weekly)
    }

    pub fn monthly() -> Self {
        Self::new(BarInterval::Monthly)
    }

    pub fn intraday(minutes: u32) -> Self {
        Self::new(BarInterval::Intraday { minutes })
    }

    /// Wrap `receiver` for shared access and attach it. The returned handle
    /// reads the receiver's results between bars.
    pub fn subscribe<R>(&mut self, receiver: R) -> (SubscriptionId, Arc<Mutex<R>>)
    where
        R: BarReceiver + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(receiver));
        let id = self.attach(shared.clone());
        (id, shared)
    }

    pub fn attach(&mut self, receiver: SharedReceiver) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscribers.push((id, receiver));
        debug!(%id, subscribers = self.subscribers.len(), "Attached receiver");
        id
    }

    pub fn detach(&mut self, id: SubscriptionId) -> Option<SharedReceiver> {
        let pos = self.subscribers.iter().position(|(sid, _)| *sid == id)?;
        let (_, receiver) = self.subscribers.remove(pos);
        debug!(%id, subscribers = self.subscribers.len(), "Detached receiver");
        Some(receiver)
    }

    /// Record `bar` and deliver it to every subscriber. Returns the bar's
    /// 1-based index.
    ///
    /// A subscriber that panics is detached once the bar has been delivered to
    /// everyone else, and the call reports it as
    /// [`StreamError::SubscriberFaulted`]. The bar stays in the history.
    pub async fn receive_bar(&mut self, bar: Bar) -> Result<usize, StreamError> {
        self.bar_index += 1;
        let bar_index = self.bar_index;
        self.history.push(bar);
        self.min_value = self.min_value.min(bar.low());
        self.max_value = self.max_value.max(bar.high());

        trace!(
            bar_index,
            timestamp = %bar.timestamp(),
            subscribers = self.subscribers.len(),
            "Dispatching bar"
        );

        let mut tasks = JoinSet::new();
        for (id, receiver) in &self.subscribers {
            let id = *id;
            let receiver = Arc::clone(receiver);
            tasks.spawn(async move { (id, deliver(&receiver, &bar, bar_index)) });
        }
        let pending = self.subscribers.iter().map(|(id, _)| *id).collect();
        let mut faults = join_deliveries(tasks, pending).await;

        if faults.is_empty() {
            return Ok(bar_index);
        }

        // Keep reports in attach order.
        faults.sort_by_key(|fault| {
            self.subscribers
                .iter()
                .position(|(id, _)| *id == fault.id)
                .unwrap_or(usize::MAX)
        });
        for fault in &faults {
            warn!(id = %fault.id, bar_index, error = %fault.message, "Quarantining faulted receiver");
            self.detach(fault.id);
        }
        Err(StreamError::SubscriberFaulted { bar_index, faults })
    }

    pub fn history(&self) -> &[Bar] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Index of the most recent bar; 0 before any bar.
    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    pub fn interval(&self) -> BarInterval {
        self.interval
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Lowest low seen so far.
    pub fn min_value(&self) -> Option<f64> {
        (!self.history.is_empty()).then_some(self.min_value)
    }

    /// Highest high seen so far.
    pub fn max_value(&self) -> Option<f64> {
        (!self.history.is_empty()).then_some(self.max_value)
    }

    /// Timestamp of the first bar.
    pub fn min_date(&self) -> Result<DateTime<Utc>, StreamError> {
        self.history
            .first()
            .map(Bar::timestamp)
            .ok_or(StreamError::EmptyStream)
    }

    /// Timestamp of the most recent bar.
    pub fn max_date(&self) -> Result<DateTime<Utc>, StreamError> {
        self.history
            .last()
            .map(Bar::timestamp)
            .ok_or(StreamError::EmptyStream)
    }
}

impl std::fmt::Debug for BarStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarStream")
            .field("interval", &self.interval)
            .field("bars", &self.history.len())
            .field("bar_index", &self.bar_index)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Wait for every delivery task. A task that fails to join is reported
/// against each subscriber that never returned an outcome.
async fn join_deliveries(
    mut tasks: JoinSet<(SubscriptionId, Result<(), String>)>,
    mut pending: Vec<SubscriptionId>,
) -> Vec<SubscriberFault> {
    let mut faults = Vec::new();
    let mut join_errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, outcome)) => {
                pending.retain(|p| *p != id);
                if let Err(message) = outcome {
                    faults.push(SubscriberFault { id, message });
                }
            }
            Err(e) => join_errors.push(e.to_string()),
        }
    }
    if !pending.is_empty() {
        let message = join_errors.join("; ");
        faults.extend(pending.into_iter().map(|id| SubscriberFault {
            id,
            message: message.clone(),
        }));
    }
    faults
}

fn deliver(receiver: &SharedReceiver, bar: &Bar, bar_index: usize) -> Result<(), String> {
    catch_unwind(AssertUnwindSafe(|| match receiver.lock() {
        Ok(mut guard) => {
            guard.receive_bar(bar, bar_index);
            Ok(())
        }
        Err(_) => Err("receiver lock poisoned".to_string()),
    }))
    .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "receiver panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tickstream_indicators::{Indicator, Macd, Sar, Sma};

    fn bar(day: i64, low: f64, high: f64, close: f64) -> Bar {
        Bar::new(
            DateTime::UNIX_EPOCH + Duration::days(day),
            close,
            high,
            low,
            close,
            100.0,
        )
    }

    fn bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let close = 50.0 + (i as f64 / 3.0).sin() * 5.0 + i as f64 * 0.1;
                bar(i as i64, close - 1.0, close + 1.0, close)
            })
            .collect()
    }

    struct Exploder {
        at: usize,
        seen: Vec<usize>,
    }

    impl BarReceiver for Exploder {
        fn receive_bar(&mut self, _bar: &Bar, bar_index: usize) {
            if bar_index == self.at {
                panic!("exploded on bar {bar_index}");
            }
            self.seen.push(bar_index);
        }
    }

    #[tokio::test]
    async fn test_empty_stream_dates_fail() {
        let stream = BarStream::daily();
        assert!(stream.is_empty());
        assert!(matches!(stream.min_date(), Err(StreamError::EmptyStream)));
        assert!(matches!(stream.max_date(), Err(StreamError::EmptyStream)));
        assert_eq!(stream.min_value(), None);
        assert_eq!(stream.bar_index(), 0);
    }

    #[tokio::test]
    async fn test_history_and_bounds() {
        let mut stream = BarStream::intraday(15);
        for b in bars(5) {
            stream.receive_bar(b).await.unwrap();
        }
        let history = stream.history();
        assert_eq!(stream.len(), 5);
        assert_eq!(stream.bar_index(), 5);
        assert_eq!(stream.interval(), BarInterval::Intraday { minutes: 15 });
        assert_eq!(stream.min_date().unwrap(), history[0].timestamp());
        assert_eq!(stream.max_date().unwrap(), history[4].timestamp());
        let lowest = history.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
        assert_eq!(stream.min_value(), Some(lowest));
    }

    #[tokio::test]
    async fn test_fan_out_matches_direct_feed() {
        let input = bars(120);
        let mut stream = BarStream::daily();
        let (_, sma) = stream.subscribe(Sma::new(10).unwrap());
        let (_, macd) = stream.subscribe(Macd::default_periods().unwrap());
        let (_, sar) = stream.subscribe(Sar::default_params().unwrap());
        assert_eq!(stream.subscriber_count(), 3);

        for b in &input {
            stream.receive_bar(*b).await.unwrap();
        }

        let mut direct_sma = Sma::new(10).unwrap();
        let mut direct_sar = Sar::default_params().unwrap();
        for (i, b) in input.iter().enumerate() {
            direct_sma.receive_bar(b, i + 1);
            direct_sar.receive_bar(b, i + 1);
        }

        let sma = sma.lock().unwrap();
        assert_eq!(sma.data(), direct_sma.data());
        assert_eq!(sma.valid_from_bar(), Some(10));
        assert_eq!(sar.lock().unwrap().data(), direct_sar.data());
        assert_eq!(macd.lock().unwrap().len(), 120 - 33);
    }

    #[tokio::test]
    async fn test_detach_stops_delivery() {
        let mut stream = BarStream::daily();
        let (id, sma) = stream.subscribe(Sma::new(1).unwrap());
        let input = bars(4);
        stream.receive_bar(input[0]).await.unwrap();
        stream.receive_bar(input[1]).await.unwrap();

        assert!(stream.detach(id).is_some());
        assert!(stream.detach(id).is_none());
        stream.receive_bar(input[2]).await.unwrap();

        assert_eq!(sma.lock().unwrap().len(), 2);
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_quarantined() {
        let mut stream = BarStream::daily();
        let (bad, _) = stream.subscribe(Exploder { at: 2, seen: Vec::new() });
        let (_, good) = stream.subscribe(Exploder { at: usize::MAX, seen: Vec::new() });
        let input = bars(3);

        assert_eq!(stream.receive_bar(input[0]).await.unwrap(), 1);
        match stream.receive_bar(input[1]).await {
            Err(StreamError::SubscriberFaulted { bar_index, faults }) => {
                assert_eq!(bar_index, 2);
                assert_eq!(faults.len(), 1);
                assert_eq!(faults[0].id, bad);
                assert!(faults[0].message.contains("exploded on bar 2"));
            }
            other => panic!("expected a subscriber fault, got {other:?}"),
        }

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.subscriber_count(), 1);
        assert_eq!(stream.receive_bar(input[2]).await.unwrap(), 3);
        assert_eq!(good.lock().unwrap().seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_attach_shared_receiver() {
        let mut stream = BarStream::weekly();
        let shared: Arc<Mutex<Sma>> = Arc::new(Mutex::new(Sma::new(2).unwrap()));
        let erased: SharedReceiver = shared.clone();
        stream.attach(erased);
        for b in bars(3) {
            stream.receive_bar(b).await.unwrap();
        }
        assert_eq!(shared.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_join_failure_is_reported_with_other_faults() {
        let ok = SubscriptionId::new();
        let faulted = SubscriptionId::new();
        let lost = SubscriptionId::new();

        let mut tasks = JoinSet::new();
        tasks.spawn(async move { (ok, Ok(())) });
        tasks.spawn(async move { (faulted, Err("bad bar".to_string())) });
        tasks.spawn(async move {
            if lost.0.is_nil() {
                return (lost, Ok(()));
            }
            panic!("task died outside delivery");
        });

        let mut faults = join_deliveries(tasks, vec![ok, faulted, lost]).await;
        faults.sort_by_key(|fault| fault.id != faulted);

        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].id, faulted);
        assert_eq!(faults[0].message, "bad bar");
        assert_eq!(faults[1].id, lost);
        assert!(!faults[1].message.is_empty());
    }
}
