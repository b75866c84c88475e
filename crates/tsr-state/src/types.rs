use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Milliseconds since an arbitrary epoch. Signed so prepare-ahead arithmetic
/// (`transitionTime - IDEAL_PREPARE`) never wraps.
pub type Timestamp = i64;

pub type LayerId = String;
pub type DeviceId = String;
pub type TimelineObjId = String;

/// Device kind tag used by the Mapping Table to route layers to their owning
/// device's Projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
	HttpSend,
	VideoServer,
}

/// A single resolved timeline object bound to a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedObject {
	pub id: TimelineObjId,
	pub instance_start: Timestamp,
	pub content: serde_json::Value,
	pub is_lookahead: bool,
	pub lookahead_for_layer: Option<LayerId>,
}

impl ResolvedObject {
	pub fn new(id: impl Into<String>, instance_start: Timestamp, content: serde_json::Value) -> Self {
		Self {
			id: id.into(),
			instance_start,
			content,
			is_lookahead: false,
			lookahead_for_layer: None,
		}
	}

	pub fn as_lookahead_for(mut self, layer: impl Into<String>) -> Self {
		self.is_lookahead = true;
		self.lookahead_for_layer = Some(layer.into());
		self
	}
}

/// A future point at which the resolved timeline is expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextEvent {
	pub time: Timestamp,
	pub layer: LayerId,
}

/// The resolved timeline at one instant, as handed to `handle_state`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
	pub time: Timestamp,
	pub layers: HashMap<LayerId, ResolvedObject>,
	pub next_events: Vec<NextEvent>,
}

impl TimelineSnapshot {
	pub fn new(time: Timestamp) -> Self {
		Self {
			time,
			layers: HashMap::new(),
			next_events: Vec::new(),
		}
	}

	pub fn with_layer(mut self, layer: impl Into<String>, object: ResolvedObject) -> Self {
		self.layers.insert(layer.into(), object);
		self
	}
}

/// Binding from a timeline layer id to a concrete device output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
	pub device: DeviceKind,
	pub device_id: DeviceId,
	#[serde(default)]
	pub extra: serde_json::Value,
}

impl Mapping {
	pub fn new(device: DeviceKind, device_id: impl Into<String>) -> Self {
		Self {
			device,
			device_id: device_id.into(),
			extra: serde_json::Value::Null,
		}
	}
}

pub type Mappings = HashMap<LayerId, Mapping>;

/// A diff-emitted command destined for the Timed Queue.
///
/// `kind` is device-specific (`tsr-device-http::HttpCommandKind`,
/// `tsr-device-videoserver::VideoServerCommandKind`, ...), so `Command` is
/// generic over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command<K> {
	pub execute_at: Timestamp,
	pub queue_key: Option<String>,
	pub kind: K,
	pub payload: serde_json::Value,
	pub timeline_obj_id: TimelineObjId,
	pub context: String,
	pub temporal_priority: Option<i32>,
}

impl<K> Command<K> {
	pub fn new(execute_at: Timestamp, kind: K, timeline_obj_id: impl Into<String>, context: impl Into<String>) -> Self {
		Self {
			execute_at,
			queue_key: None,
			kind,
			payload: serde_json::Value::Null,
			timeline_obj_id: timeline_obj_id.into(),
			context: context.into(),
			temporal_priority: None,
		}
	}

	pub fn with_queue_key(mut self, queue_key: impl Into<String>) -> Self {
		self.queue_key = Some(queue_key.into());
		self
	}

	pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
		self.payload = payload;
		self
	}

	pub fn with_temporal_priority(mut self, priority: i32) -> Self {
		self.temporal_priority = Some(priority);
		self
	}
}
