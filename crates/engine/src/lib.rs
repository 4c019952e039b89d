pub mod stream;

pub use stream::{BarStream, SharedReceiver, StreamError, SubscriberFault, SubscriptionId};
