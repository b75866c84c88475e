//! Tracked State (§3, §4.5): the executor's ground-truth beliefs about an
//! external device's resources.
//!
//! Grounded on `ws-connection::core::store::ConnectionStore`'s `DashMap`-of-
//! handles shape, generalized from connection handles to arbitrary tracked
//! remote resources. Invariant: callers must only call `set` after a
//! successful protocol acknowledgement; on failure leave the entry alone so
//! a later retry/resync converges.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;

#[derive(Clone)]
pub struct TrackedState<K, V> {
	entries: Arc<DashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TrackedState<K, V> {
	pub fn new() -> Self {
		Self { entries: Arc::new(DashMap::new()) }
	}

	pub fn get(&self, key: &K) -> Option<V> {
		self.entries.get(key).map(|entry| entry.value().clone())
	}

	/// Record believed remote state. Call only after a successful protocol
	/// acknowledgement.
	pub fn set(&self, key: K, value: V) {
		self.entries.insert(key, value);
	}

	pub fn remove(&self, key: &K) -> Option<V> {
		self.entries.remove(key).map(|(_, v)| v)
	}

	pub fn contains(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}

	pub fn update<F: FnOnce(&mut V)>(&self, key: &K, f: F) -> bool {
		if let Some(mut entry) = self.entries.get_mut(key) {
			f(entry.value_mut());
			true
		} else {
			false
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&self) {
		self.entries.clear();
	}

	pub fn keys(&self) -> Vec<K> {
		self.entries.iter().map(|e| e.key().clone()).collect()
	}
}

impl<K: Eq + Hash + Clone, V: Clone> Default for TrackedState<K, V> {
	fn default() -> Self {
		Self::new()
	}
}
