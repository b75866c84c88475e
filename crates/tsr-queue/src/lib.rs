pub mod error;
pub mod heap;
pub mod queue;

pub use error::QueueError;
pub use heap::{HeapOrd, MinHeap};
pub use queue::{Callback, DeliveryMode, DoOnTime, DoOnTimeConfig, QueueEntry, QueueKey, QueueSignal, Timestamp};
