pub mod broadcast;
pub mod registry;

pub use broadcast::Broadcaster;
pub use registry::{Subscriber, SubscriberRegistry};

// Live push fan-out: the registry tracks the set of currently-open admin
// streams, and the broadcaster re-reads the hosted document after every
// successful mutation and delivers the fresh snapshot to each of them.
