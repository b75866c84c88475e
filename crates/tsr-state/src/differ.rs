//! Differ scaffolding (§4.4): the minimum ordered set of commands
//! transforming an old device state into a new one.
//!
//! Grounded on `stream-stepper::timeline::LiveTimeline::process_event`'s
//! add/update/remove handling over a uid-keyed map, generalized from
//! timeline events to device-state diffing.

use crate::types::{Command, Timestamp};

/// Pure function from a state transition to an ordered command list.
pub trait Differ<S, K> {
	fn diff(&self, old: &S, new: &S, transition_time: Timestamp) -> Vec<Command<K>>;
}

/// Prepare-ahead scheduling per §4.4:
/// `executeAt = max(oldState.time + PREPARE_WAIT, transitionTime - IDEAL_PREPARE)`.
/// This guarantees prepare precedes transition *and* prepare never precedes
/// the old state's time.
#[derive(Debug, Clone, Copy)]
pub struct PrepareTiming {
	pub prepare_wait: Timestamp,
	pub ideal_prepare: Timestamp,
}

impl Default for PrepareTiming {
	fn default() -> Self {
		Self {
			prepare_wait: 20,
			ideal_prepare: 1_000,
		}
	}
}

impl PrepareTiming {
	pub fn prepare_execute_at(&self, old_state_time: Timestamp, transition_time: Timestamp) -> Timestamp {
		(old_state_time + self.prepare_wait).max(transition_time - self.ideal_prepare)
	}
}

/// Two-pass stable sort implementing §4.4's ordering rule: a stable
/// secondary key (`timeline_obj_id`) establishes the tie-break order first,
/// then a stable sort by `temporal_priority` (lower first, absent last)
/// becomes the dominant order while preserving that tie-break among equals.
pub fn order_commands<K>(mut commands: Vec<Command<K>>) -> Vec<Command<K>> {
	commands.sort_by(|a, b| a.timeline_obj_id.cmp(&b.timeline_obj_id));
	commands.sort_by_key(|c| c.temporal_priority.unwrap_or(i32::MAX));
	commands
}
