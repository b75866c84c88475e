//! Stateful Device differ (§4.4 "Stateful-device differ specifics"):
//!
//! - channel binding changed -> `SETUP_PORT` at prepare-time
//! - clip title changed -> `LOAD_FRAGMENTS` at prepare-time, then
//!   `PLAY`/`PAUSE` at transition-time
//! - clip unchanged in title but otherwise different (e.g. play toggled) ->
//!   `PLAY`/`PAUSE` at transition-time only, no reload
//! - clip became absent -> `CLEAR`
//! - port itself disappeared -> `RELEASE_PORT`
//!
//! Does not implement `tsr_state::Differ` literally: that trait's `diff`
//! takes no `old_state.time`, but the prepare-ahead floor in §4.4
//! (`oldState.time + PREPARE_WAIT`) needs it, so this differ takes it as an
//! explicit argument instead (Open Question noted in DESIGN.md).

use crate::command::VideoServerCommandKind;
use crate::device_state::{ClipState, VideoServerDeviceState};
use serde_json::json;
use tsr_state::{order_commands, Command, PrepareTiming, Timestamp};

pub type VideoServerCommandList = Vec<Command<VideoServerCommandKind>>;

pub struct VideoServerDiffer {
	pub prepare_timing: PrepareTiming,
}

impl Default for VideoServerDiffer {
	fn default() -> Self {
		Self {
			prepare_timing: PrepareTiming::default(),
		}
	}
}

impl VideoServerDiffer {
	pub fn diff(&self, old: &VideoServerDeviceState, old_state_time: Timestamp, new: &VideoServerDeviceState, transition_time: Timestamp) -> VideoServerCommandList {
		let mut commands = Vec::new();
		let prepare_at = self.prepare_timing.prepare_execute_at(old_state_time, transition_time);

		for (port_id, new_port) in &new.ports {
			let old_port = old.ports.get(port_id);

			let channel_changed = old_port.map(|p| p.channel) != Some(new_port.channel);
			if channel_changed {
				commands.push(
					Command::new(prepare_at, VideoServerCommandKind::SetupPort, port_id.clone(), format!("setup port {port_id} on channel {}", new_port.channel))
						.with_queue_key(port_id.clone())
						.with_payload(json!({ "portId": port_id, "channel": new_port.channel })),
				);
			}

			let old_clip = old_port.and_then(|p| p.clip.as_ref());
			self.diff_clip(&mut commands, port_id, old_clip, new_port.clip.as_ref(), prepare_at, transition_time);
		}

		for port_id in old.ports.keys() {
			if !new.ports.contains_key(port_id) {
				commands.push(
					Command::new(transition_time, VideoServerCommandKind::ReleasePort, port_id.clone(), format!("release port {port_id}"))
						.with_queue_key(port_id.clone())
						.with_payload(json!({ "portId": port_id })),
				);
			}
		}

		order_commands(commands)
	}

	fn diff_clip(&self, commands: &mut VideoServerCommandList, port_id: &str, old_clip: Option<&ClipState>, new_clip: Option<&ClipState>, prepare_at: Timestamp, transition_time: Timestamp) {
		let Some(clip) = new_clip else {
			if old_clip.is_some() {
				commands.push(
					Command::new(transition_time, VideoServerCommandKind::Clear, port_id.to_string(), format!("clear port {port_id}"))
						.with_queue_key(port_id.to_string())
						.with_payload(json!({ "portId": port_id })),
				);
			}
			return;
		};

		let title_changed = old_clip.map(|c| c.title.as_str()) != Some(clip.title.as_str());
		if title_changed {
			commands.push(
				Command::new(prepare_at, VideoServerCommandKind::LoadFragments, port_id.to_string(), format!("load fragments for '{}' on port {port_id}", clip.title))
					.with_queue_key(port_id.to_string())
					.with_payload(json!({ "portId": port_id, "title": clip.title, "timeOfPlay": clip.play_time })),
			);
		}

		if title_changed || old_clip != Some(clip) {
			let kind = if clip.playing { VideoServerCommandKind::Play } else { VideoServerCommandKind::Pause };
			commands.push(
				Command::new(transition_time, kind, port_id.to_string(), format!("{kind:?} clip '{}' on port {port_id}", clip.title))
					.with_queue_key(port_id.to_string())
					.with_payload(json!({
						"portId": port_id,
						"title": clip.title,
						"playTime": clip.play_time,
						"pauseTime": clip.pause_time,
						"fps": clip.fps,
					})),
			);
		}
	}
}
