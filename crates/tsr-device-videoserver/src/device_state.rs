//! Video-server device state shape (§3, §4.4): one port entry per mapped
//! layer, carrying the channel binding and the clip (if any) currently
//! placed on that port.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tsr_state::DeviceState;

pub type PortId = String;

/// Default playback rate when clip metadata provides none (§4.5).
pub const DEFAULT_FPS: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipState {
	pub title: String,
	pub playing: bool,
	/// ms at which the object's instance starts; the reference point for
	/// the PLAY/PAUSE jump-offset formula (§4.5).
	pub play_time: i64,
	pub pause_time: Option<i64>,
	pub fps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortState {
	/// Only the first channel of a multi-channel port mapping is used
	/// (§4.4 documented limitation).
	pub channel: u32,
	pub clip: Option<ClipState>,
	/// The lookahead layer's resolved clip, if any (§4.3 "lookahead layers
	/// populate a 'next up' slot on the foreground layer"). Not diffed
	/// against the tracked port state; purely informational for a conductor
	/// that wants to pre-fetch or display what's coming next.
	pub next_up: Option<ClipState>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoServerDeviceState {
	pub ports: HashMap<PortId, PortState>,
}

impl DeviceState for VideoServerDeviceState {
	fn empty() -> Self {
		Self::default()
	}
}
