//! TTL cache with single-flight `get_set` (§9).
//!
//! Grounded on `ws-conn-manager::ConnectionGuard`'s per-key admission
//! pattern (a `DashMap` of per-key synchronization primitives), generalized
//! from "admit or queue" to "compute once, share the result among
//! concurrent callers for the same missing key".

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tsr_signals::Clock;

struct CacheEntry<V> {
	expires_at: i64,
	value: V,
}

/// A `{expiresAt, value}` map with a counter-triggered sweep every 100th
/// write (§9). Single-flight `get_set`: concurrent callers racing on the
/// same missing key share one computation instead of stampeding.
pub struct TtlCache<K, V> {
	entries: DashMap<K, CacheEntry<V>>,
	in_flight: DashMap<K, Arc<Mutex<()>>>,
	ttl_ms: i64,
	sweep_every: u64,
	writes: AtomicU64,
	clock: Arc<dyn Clock>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
	pub fn new(ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
		Self {
			entries: DashMap::new(),
			in_flight: DashMap::new(),
			ttl_ms,
			sweep_every: 100,
			writes: AtomicU64::new(0),
			clock,
		}
	}

	pub fn get(&self, key: &K) -> Option<V> {
		let now = self.clock.now_ms();
		match self.entries.get(key) {
			Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
			_ => None,
		}
	}

	pub fn set(&self, key: K, value: V) {
		let expires_at = self.clock.now_ms() + self.ttl_ms;
		self.entries.insert(key, CacheEntry { expires_at, value });
		self.note_write();
	}

	pub fn invalidate(&self, key: &K) {
		self.entries.remove(key);
	}

	/// Return the cached value if fresh; otherwise compute it once, sharing
	/// the computation across concurrent callers for the same key.
	pub async fn get_set<F, Fut>(&self, key: K, compute: F) -> V
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = V>,
	{
		if let Some(value) = self.get(&key) {
			return value;
		}

		let lock = self.in_flight.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
		let _guard = lock.lock().await;

		if let Some(value) = self.get(&key) {
			return value;
		}

		let value = compute().await;
		self.set(key.clone(), value.clone());
		self.in_flight.remove(&key);
		value
	}

	/// Like `get_set`, but for a `compute` that can fail: a failure is
	/// propagated to the caller and never populates the cache, so a
	/// transient error isn't frozen in as a cached "success" for the TTL.
	pub async fn get_set_fallible<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<V, E>>,
	{
		if let Some(value) = self.get(&key) {
			return Ok(value);
		}

		let lock = self.in_flight.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
		let _guard = lock.lock().await;

		if let Some(value) = self.get(&key) {
			return Ok(value);
		}

		let result = compute().await;
		if let Ok(value) = &result {
			self.set(key.clone(), value.clone());
		}
		self.in_flight.remove(&key);
		result
	}

	fn note_write(&self) {
		let count = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
		if count % self.sweep_every == 0 {
			self.sweep();
		}
	}

	pub fn sweep(&self) {
		let now = self.clock.now_ms();
		self.entries.retain(|_, entry| entry.expires_at > now);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
