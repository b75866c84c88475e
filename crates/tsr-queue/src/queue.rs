//! `DoOnTime`: the time-ordered command queue from §4.1.

use crate::heap::{HeapOrd, MinHeap};
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tsr_signals::Clock;
use uuid::Uuid;

pub type Timestamp = i64;
pub type QueueKey = String;

pub type Callback = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), String>> + Send>;

/// Delivery discipline chosen at construction (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
	/// Same-`queueKey` callbacks run strictly in `fireTime` order, one at a
	/// time; different keys are independent.
	InOrder,
	/// Every due entry fires as soon as it's due, in parallel, no per-key
	/// serialization.
	Burst,
}

/// Read-only snapshot of a queued entry, returned by `get_queue`.
#[derive(Debug, Clone)]
pub struct QueueEntry {
	pub id: Uuid,
	pub fire_time: Timestamp,
	pub queue_key: Option<QueueKey>,
	pub context: String,
}

struct HeapEntry {
	id: Uuid,
	fire_time: Timestamp,
	seq: u64,
	queue_key: Option<QueueKey>,
	context: String,
}

impl HeapOrd for HeapEntry {
	fn heap_key(&self) -> (i64, u64) {
		(self.fire_time, self.seq)
	}
}

impl std::fmt::Debug for HeapEntry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HeapEntry").field("id", &self.id).field("fire_time", &self.fire_time).field("queue_key", &self.queue_key).finish()
	}
}

impl From<&HeapEntry> for QueueEntry {
	fn from(e: &HeapEntry) -> Self {
		Self {
			id: e.id,
			fire_time: e.fire_time,
			queue_key: e.queue_key.clone(),
			context: e.context.clone(),
		}
	}
}

/// Diagnostic signal emitted by the queue's ticker (§4.1, §6).
#[derive(Debug, Clone)]
pub enum QueueSignal {
	Error { command_id: Uuid, context: String, message: String },
	SlowCommand { command_id: Uuid, context: String, overage_ms: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct DoOnTimeConfig {
	/// §4.1 "slowCommand signal when a callback takes longer than a
	/// configurable threshold from its due time to completion".
	pub slow_command_threshold_ms: i64,
}

impl Default for DoOnTimeConfig {
	fn default() -> Self {
		Self { slow_command_threshold_ms: 50 }
	}
}

struct Inner {
	heap: Mutex<MinHeap<HeapEntry>>,
	callbacks: DashMap<Uuid, Callback>,
	key_locks: DashMap<QueueKey, Arc<Mutex<()>>>,
	seq: AtomicU64,
	disposed: AtomicBool,
	wake: Notify,
	signal_tx: broadcast::Sender<QueueSignal>,
	clock: Arc<dyn Clock>,
	mode: DeliveryMode,
	config: DoOnTimeConfig,
}

/// The timed queue itself. Cloning shares the same ticker and heap (the
/// handle is cheap, `Arc`-backed, the way `ws-connection::ConnectionHandle`
/// is cheap to clone).
pub struct DoOnTime {
	inner: Arc<Inner>,
	ticker: Option<JoinHandle<()>>,
}

impl DoOnTime {
	pub fn new(mode: DeliveryMode, clock: Arc<dyn Clock>, config: DoOnTimeConfig) -> Self {
		let (signal_tx, _) = broadcast::channel(256);
		let inner = Arc::new(Inner {
			heap: Mutex::new(MinHeap::new()),
			callbacks: DashMap::new(),
			key_locks: DashMap::new(),
			seq: AtomicU64::new(0),
			disposed: AtomicBool::new(false),
			wake: Notify::new(),
			signal_tx,
			clock,
			mode,
			config,
		});

		let ticker_inner = inner.clone();
		let ticker = tokio::spawn(async move { Self::run_ticker(ticker_inner).await });

		Self { inner, ticker: Some(ticker) }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<QueueSignal> {
		self.inner.signal_tx.subscribe()
	}

	/// Enqueue a callback to fire at `fire_time`. Returns a handle id that
	/// can be cross-referenced against `get_queue()`.
	pub async fn queue<F, Fut>(&self, fire_time: Timestamp, queue_key: Option<QueueKey>, context: impl Into<String>, callback: F) -> Uuid
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
	{
		let id = Uuid::new_v4();
		let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
		let context = context.into();

		self.inner.callbacks.insert(id, Box::new(move || Box::pin(callback())));

		{
			let mut heap = self.inner.heap.lock().await;
			heap.push(HeapEntry {
				id,
				fire_time,
				seq,
				queue_key,
				context,
			});
		}

		self.inner.wake.notify_one();
		id
	}

	/// §4.1: removes entries with `fireTime > t`.
	pub async fn clear_queue_after(&self, t: Timestamp) {
		self.remove_matching(|fire_time| fire_time > t).await;
	}

	/// §4.1: removes entries with `fireTime >= t`.
	pub async fn clear_queue_now_and_after(&self, t: Timestamp) {
		self.remove_matching(|fire_time| fire_time >= t).await;
	}

	async fn remove_matching<F: Fn(Timestamp) -> bool>(&self, should_remove: F) {
		let mut removed = Vec::new();
		{
			let mut heap = self.inner.heap.lock().await;
			heap.retain(|entry| {
				let remove = should_remove(entry.fire_time);
				if remove {
					removed.push(entry.id);
				}
				!remove
			});
		}
		for id in removed {
			self.inner.callbacks.remove(&id);
		}
	}

	/// Read-only snapshot, ordered by `fireTime`.
	pub async fn get_queue(&self) -> Vec<QueueEntry> {
		let heap = self.inner.heap.lock().await;
		let mut entries: Vec<QueueEntry> = heap.iter().map(QueueEntry::from).collect();
		entries.sort_by_key(|e| e.fire_time);
		entries
	}

	pub async fn len(&self) -> usize {
		self.inner.heap.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.inner.heap.lock().await.is_empty()
	}

	/// Cancels the ticker and drops all entries. Already in-flight callbacks
	/// run to completion; their results are discarded (§5 Cancellation).
	pub async fn dispose(&mut self) {
		self.inner.disposed.store(true, Ordering::SeqCst);
		self.inner.wake.notify_waiters();
		if let Some(handle) = self.ticker.take() {
			handle.abort();
		}
		self.inner.heap.lock().await.clear();
		self.inner.callbacks.clear();
	}

	async fn run_ticker(inner: Arc<Inner>) {
		loop {
			if inner.disposed.load(Ordering::SeqCst) {
				return;
			}

			let next_fire_time = {
				let heap = inner.heap.lock().await;
				heap.peek().map(|e| e.fire_time)
			};

			match next_fire_time {
				None => {
					inner.wake.notified().await;
				}
				Some(fire_time) => {
					let now = inner.clock.now_ms();
					if fire_time <= now {
						Self::fire_due_entries(&inner, now).await;
					} else {
						let wait = Duration::from_millis((fire_time - now).max(0) as u64);
						tokio::select! {
							_ = inner.wake.notified() => {}
							_ = tokio::time::sleep(wait) => {}
						}
					}
				}
			}
		}
	}

	async fn fire_due_entries(inner: &Arc<Inner>, now: Timestamp) {
		loop {
			let due = {
				let mut heap = inner.heap.lock().await;
				match heap.peek() {
					Some(entry) if entry.fire_time <= now => heap.pop(),
					_ => None,
				}
			};

			let Some(entry) = due else { break };
			let Some((_, callback)) = inner.callbacks.remove(&entry.id) else {
				continue;
			};

			Self::dispatch(inner.clone(), entry, callback).await;
		}
	}

	async fn dispatch(inner: Arc<Inner>, entry: HeapEntry, callback: Callback) {
		match inner.mode {
			DeliveryMode::Burst => {
				tokio::spawn(Self::run_callback(inner, entry, callback));
			}
			DeliveryMode::InOrder => {
				let lock = entry
					.queue_key
					.clone()
					.map(|key| inner.key_locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone());
				tokio::spawn(async move {
					let _guard = match &lock {
						Some(lock) => Some(lock.lock().await),
						None => None,
					};
					Self::run_callback(inner, entry, callback).await;
				});
			}
		}
	}

	async fn run_callback(inner: Arc<Inner>, entry: HeapEntry, callback: Callback) {
		let result = callback().await;
		let completed_at = inner.clock.now_ms();

		let overage = completed_at - entry.fire_time;
		if overage > inner.config.slow_command_threshold_ms {
			warn!(command_id = %entry.id, overage_ms = overage, "slow command");
			let _ = inner.signal_tx.send(QueueSignal::SlowCommand {
				command_id: entry.id,
				context: entry.context.clone(),
				overage_ms: overage,
			});
		}

		if let Err(message) = result {
			let _ = inner.signal_tx.send(QueueSignal::Error {
				command_id: entry.id,
				context: entry.context,
				message,
			});
		} else {
			debug!(command_id = %entry.id, "command completed");
		}
	}
}

impl Drop for DoOnTime {
	fn drop(&mut self) {
		self.inner.disposed.store(true, Ordering::SeqCst);
		self.inner.wake.notify_waiters();
		if let Some(handle) = self.ticker.take() {
			handle.abort();
		}
	}
}
