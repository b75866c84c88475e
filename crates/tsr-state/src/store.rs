//! State Store: an ordered log of `(timestamp, deviceState)` snapshots (§4.2).
//!
//! Grounded on `stream-stepper::state::TimelineState`'s versioned map shape,
//! generalized from "chapters" to "arbitrary device sub-states" and reordered
//! into a `BTreeMap` so `get_state_before` is a range query, not a scan.

use crate::types::Timestamp;
use std::collections::BTreeMap;

/// Device-specific state shape requirements (§3 Device State):
/// deep equality for diffing, a representable empty state, and the bounds
/// needed to live inside the store and cross an await point.
pub trait DeviceState: Clone + PartialEq + Send + Sync + 'static {
	fn empty() -> Self;
}

pub struct StateStore<S: DeviceState> {
	entries: BTreeMap<Timestamp, S>,
}

impl<S: DeviceState> StateStore<S> {
	pub fn new() -> Self {
		Self { entries: BTreeMap::new() }
	}

	/// Entry with the greatest timestamp strictly less than `t`, or `None`.
	/// `handle_state` treats `None` as the empty state (§4.2).
	pub fn get_state_before(&self, t: Timestamp) -> Option<&S> {
		self.entries.range(..t).next_back().map(|(_, s)| s)
	}

	/// Same lookup as `get_state_before`, but also returns the entry's own
	/// timestamp. Stateful differs need it as the floor for prepare-ahead
	/// scheduling (`oldState.time + PREPARE_WAIT`, §4.4); `get_state_before`
	/// stays the common case since most differs don't need it.
	pub fn get_entry_before(&self, t: Timestamp) -> Option<(Timestamp, &S)> {
		self.entries.range(..t).next_back().map(|(t, s)| (*t, s))
	}

	/// Insert, overwriting any entry at exactly `t`.
	pub fn set_state(&mut self, s: S, t: Timestamp) {
		self.entries.insert(t, s);
	}

	/// Discards entries older than `up_to - min_age`, but always leaves at
	/// least one entry strictly earlier than any future query at or after
	/// that cutoff (so `get_state_before` for any `t >= up_to - min_age`
	/// keeps working).
	pub fn clean_up_states(&mut self, min_age: Timestamp, up_to: Timestamp) {
		let cutoff = up_to - min_age;
		let stale: Vec<Timestamp> = self.entries.range(..cutoff).map(|(t, _)| *t).collect();
		let Some(&keep) = stale.iter().max() else {
			return;
		};
		for t in stale {
			if t != keep {
				self.entries.remove(&t);
			}
		}
	}

	pub fn clear_states(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<S: DeviceState> Default for StateStore<S> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Clone, PartialEq)]
	struct Counter(i64);

	impl DeviceState for Counter {
		fn empty() -> Self {
			Self(0)
		}
	}

	#[test]
	fn get_state_before_returns_most_recent_strictly_earlier_entry() {
		let mut store = StateStore::new();
		store.set_state(Counter(1), 100);
		store.set_state(Counter(2), 200);
		store.set_state(Counter(3), 300);

		assert_eq!(store.get_state_before(250), Some(&Counter(2)));
		assert_eq!(store.get_state_before(100), None);
		assert_eq!(store.get_state_before(101), Some(&Counter(1)));
		assert_eq!(store.get_state_before(0), None);
	}

	#[test]
	fn get_entry_before_returns_the_entrys_own_timestamp() {
		let mut store = StateStore::new();
		store.set_state(Counter(1), 100);
		store.set_state(Counter(2), 200);

		assert_eq!(store.get_entry_before(250), Some((200, &Counter(2))));
		assert_eq!(store.get_entry_before(100), None);
	}

	#[test]
	fn set_state_overwrites_entry_at_exact_timestamp() {
		let mut store = StateStore::new();
		store.set_state(Counter(1), 100);
		store.set_state(Counter(2), 100);

		assert_eq!(store.get_state_before(101), Some(&Counter(2)));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn clean_up_states_keeps_one_entry_below_cutoff() {
		let mut store = StateStore::new();
		store.set_state(Counter(1), 0);
		store.set_state(Counter(2), 100);
		store.set_state(Counter(3), 200);
		store.set_state(Counter(4), 900);

		store.clean_up_states(100, 1000);

		assert_eq!(store.len(), 2);
		assert_eq!(store.get_state_before(1000), Some(&Counter(4)));
		assert_eq!(store.get_state_before(900), Some(&Counter(3)));
	}

	#[test]
	fn clear_states_drops_everything() {
		let mut store = StateStore::new();
		store.set_state(Counter(1), 0);
		store.clear_states();

		assert!(store.is_empty());
		assert_eq!(store.get_state_before(i64::MAX), None);
	}
}
