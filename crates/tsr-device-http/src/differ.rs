//! Simple Device differ (§4.4): one command per changed/added layer; no
//! command is emitted for a layer that disappears (a stateless HTTP sink has
//! nothing to undo — §4.4's generic "removed" rule is a no-op here, unlike
//! the stateful video-server device).

use crate::command::HttpMethod;
use crate::device_state::HttpDeviceState;
use serde_json::json;
use tsr_state::{order_commands, Command, Differ, Timestamp};

pub struct HttpDiffer;

impl Differ<HttpDeviceState, HttpMethod> for HttpDiffer {
	fn diff(&self, old: &HttpDeviceState, new: &HttpDeviceState, transition_time: Timestamp) -> Vec<Command<HttpMethod>> {
		let mut commands = Vec::new();

		for (layer_id, layer) in &new.layers {
			let unchanged = old.layers.get(layer_id) == Some(layer);
			if unchanged {
				continue;
			}

			let Some(type_label) = layer.content.get("type").and_then(|v| v.as_str()) else {
				continue;
			};
			let Some(method) = HttpMethod::from_content_type(type_label) else {
				continue;
			};

			let url = layer.content.get("url").and_then(|v| v.as_str()).unwrap_or_default().to_string();
			let params = layer.content.get("params").cloned().unwrap_or(serde_json::Value::Null);

			let mut command = Command::new(transition_time, method, layer_id.clone(), format!("http send on layer {layer_id}")).with_payload(json!({
				"url": url,
				"params": params,
			}));

			if let Some(queue_key) = &layer.queue_key {
				command = command.with_queue_key(queue_key.clone());
			}
			if let Some(priority) = layer.temporal_priority {
				command = command.with_temporal_priority(priority);
			}

			commands.push(command);
		}

		order_commands(commands)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::device_state::HttpLayerState;
	use std::collections::HashMap;

	fn layer(content: serde_json::Value, priority: Option<i32>) -> HttpLayerState {
		HttpLayerState {
			content,
			temporal_priority: priority,
			queue_key: None,
		}
	}

	#[test]
	fn empty_to_single_layer_emits_one_added_command() {
		let old = HttpDeviceState::default();
		let mut new = HttpDeviceState::default();
		new.layers.insert(
			"L1".into(),
			layer(serde_json::json!({"type": "POST", "url": "http://x", "params": {"a": 1}}), None),
		);

		let commands = HttpDiffer.diff(&old, &new, 1000);
		assert_eq!(commands.len(), 1);
		assert_eq!(commands[0].execute_at, 1000);
		assert_eq!(commands[0].queue_key, None);
		assert_eq!(commands[0].kind, HttpMethod::Post);
	}

	#[test]
	fn unchanged_content_emits_nothing() {
		let mut layers = HashMap::new();
		layers.insert("L1".into(), layer(serde_json::json!({"type": "GET", "url": "http://x"}), None));
		let old = HttpDeviceState { layers: layers.clone() };
		let new = HttpDeviceState { layers };

		assert!(HttpDiffer.diff(&old, &new, 1000).is_empty());
	}

	#[test]
	fn lower_temporal_priority_orders_first() {
		let old = HttpDeviceState::default();
		let mut new = HttpDeviceState::default();
		new
			.layers
			.insert("L1".into(), layer(serde_json::json!({"type": "GET", "url": "http://a"}), Some(2)));
		new
			.layers
			.insert("L2".into(), layer(serde_json::json!({"type": "GET", "url": "http://b"}), Some(0)));

		let commands = HttpDiffer.diff(&old, &new, 1000);
		assert_eq!(commands[0].timeline_obj_id, "L2");
		assert_eq!(commands[1].timeline_obj_id, "L1");
	}

	#[test]
	fn removed_layer_emits_no_command() {
		let mut old_layers = HashMap::new();
		old_layers.insert("L1".into(), layer(serde_json::json!({"type": "GET", "url": "http://x"}), None));
		let old = HttpDeviceState { layers: old_layers };
		let new = HttpDeviceState::default();

		assert!(HttpDiffer.diff(&old, &new, 1000).is_empty());
	}
}
