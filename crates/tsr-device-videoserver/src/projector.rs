//! Stateful Device projector (§4.3): each mapped layer becomes one port
//! entry, keyed by the mapping's `device_id` (the port id), binding the
//! mapping's first channel and (if a foreground object is present) a clip.

use crate::device_state::{ClipState, PortState, VideoServerDeviceState, DEFAULT_FPS};
use std::collections::HashMap;
use tsr_signals::DeviceError;
use tsr_state::{resolve_foreground_and_lookahead, DeviceKind, Mappings, Projector, ResolvedObject, TimelineSnapshot};

pub struct VideoServerProjector;

fn clip_state_from(object: &ResolvedObject) -> ClipState {
	ClipState {
		title: object.content.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
		playing: object.content.get("playing").and_then(|v| v.as_bool()).unwrap_or(false),
		play_time: object.instance_start,
		pause_time: object.content.get("pauseTime").and_then(|v| v.as_i64()),
		fps: object.content.get("fps").and_then(|v| v.as_f64()).unwrap_or(DEFAULT_FPS),
	}
}

impl Projector<VideoServerDeviceState> for VideoServerProjector {
	fn project(&self, snapshot: &TimelineSnapshot, mappings: &Mappings) -> Result<VideoServerDeviceState, DeviceError> {
		let slots = resolve_foreground_and_lookahead(snapshot, mappings, DeviceKind::VideoServer);

		let mut ports = HashMap::new();
		for (layer_id, slot) in slots {
			let Some(mapping) = mappings.get(&layer_id) else { continue };

			let channels = mapping.extra.get("channels").and_then(|v| v.as_array()).ok_or_else(|| DeviceError::InvalidMapping {
				layer: layer_id.clone(),
				reason: "mapping is missing a `channels` array".to_string(),
			})?;
			let first_channel = channels.first().ok_or_else(|| DeviceError::InvalidMapping {
				layer: layer_id.clone(),
				reason: "mapping's `channels` array is empty".to_string(),
			})?;
			let channel = first_channel.as_u64().ok_or_else(|| DeviceError::InvalidMapping {
				layer: layer_id.clone(),
				reason: "mapping's first channel is not a non-negative integer".to_string(),
			})? as u32;

			// A lookahead with no real foreground threads the channel
			// binding through but contributes no clip (§4.3, scenario 6):
			// the differ sees an unchanged-or-empty clip until a real
			// foreground object appears.
			let clip = slot.foreground.as_ref().map(clip_state_from);
			let next_up = slot.lookahead.as_ref().map(clip_state_from);

			ports.insert(mapping.device_id.clone(), PortState { channel, clip, next_up });
		}

		Ok(VideoServerDeviceState { ports })
	}
}
