//! Simple Device projector (§4.3): every mapped layer becomes one entry in
//! the HTTP device state, carrying its raw content for the differ.

use crate::device_state::{HttpDeviceState, HttpLayerState};
use std::collections::HashMap;
use tsr_signals::DeviceError;
use tsr_state::{resolve_foreground_and_lookahead, DeviceKind, Mappings, Projector, TimelineSnapshot};

pub struct HttpProjector;

impl Projector<HttpDeviceState> for HttpProjector {
	fn project(&self, snapshot: &TimelineSnapshot, mappings: &Mappings) -> Result<HttpDeviceState, DeviceError> {
		let slots = resolve_foreground_and_lookahead(snapshot, mappings, DeviceKind::HttpSend);

		let mut layers = HashMap::new();
		for (layer_id, slot) in slots {
			// A stateless HTTP device has no "next up" rendering: a lookahead
			// with no foreground yet simply contributes nothing.
			let Some(object) = slot.foreground else { continue };

			let temporal_priority = object.content.get("temporalPriority").and_then(|v| v.as_i64()).map(|v| v as i32);
			let queue_key = object.content.get("queueId").and_then(|v| v.as_str()).map(str::to_owned);

			layers.insert(
				layer_id,
				HttpLayerState {
					content: object.content,
					temporal_priority,
					queue_key,
				},
			);
		}

		Ok(HttpDeviceState { layers })
	}
}
