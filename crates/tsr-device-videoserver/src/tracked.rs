//! Executor-local tracked state for a video-server port (§3 Tracked State,
//! §4.5 stateful executor actions). Updated only after a successful
//! protocol acknowledgement; left unchanged on failure so a later
//! retry/resync converges, per the spec's Tracked State invariant.

use std::collections::HashMap;

pub type ClipId = String;

/// The `(inPointFrames, outPointFrames)` pair identifying a fragment set,
/// used to detect whether the exact fragments are already loaded on a port
/// (§4.5 `LOAD_FRAGMENTS`: "if the exact fragment set is already loaded...
/// reuse its portInPoint/portOutPoint").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentKey {
	pub in_point_frames: i64,
	pub out_point_frames: i64,
}

/// Where a loaded fragment set landed on the port's own append timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedFragments {
	pub port_in_point: i64,
	pub port_out_point: i64,
}

#[derive(Debug, Clone)]
pub struct TrackedPort {
	pub channel: u32,
	/// Every fragment set ever loaded on this port, for the reuse check.
	pub loaded_fragments: HashMap<FragmentKey, LoadedFragments>,
	/// Whichever fragment set is the port's current content, used by
	/// `PLAY_CLIP`/`PAUSE_CLIP`'s jump-offset math.
	pub active: Option<LoadedFragments>,
	/// The port's own append cursor: where the next `LOAD_FRAGMENTS` lands.
	pub offset: i64,
	pub playing: bool,
	/// A prepared-but-not-yet-triggered soft jump's target offset, or the
	/// offset of a jump already triggered.
	pub jump_offset: Option<i64>,
	pub scheduled_stop: Option<i64>,
}

impl TrackedPort {
	pub fn new(channel: u32) -> Self {
		Self {
			channel,
			loaded_fragments: HashMap::new(),
			active: None,
			offset: 0,
			playing: false,
			jump_offset: None,
			scheduled_stop: None,
		}
	}
}
