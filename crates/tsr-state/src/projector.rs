//! Projector scaffolding (§4.3): projects a `TimelineSnapshot` onto a
//! device-specific state shape via the Mapping Table.

use crate::types::{DeviceKind, LayerId, Mappings, ResolvedObject, TimelineSnapshot};
use std::collections::HashMap;
use tsr_signals::DeviceError;

/// Pure, side-effect-free projection from resolved timeline to device state.
pub trait Projector<S> {
	fn project(&self, snapshot: &TimelineSnapshot, mappings: &Mappings) -> Result<S, DeviceError>;
}

/// What a layer resolves to once lookahead redirection is applied: the
/// (possibly absent) foreground object and a lookahead "next up" slot.
#[derive(Debug, Clone, Default)]
pub struct ForegroundSlot {
	pub foreground: Option<ResolvedObject>,
	pub lookahead: Option<ResolvedObject>,
}

/// Groups timeline layers belonging to `device` by their *effective* layer:
/// a non-lookahead object's own layer, or a lookahead object's
/// `lookahead_for_layer`. Layers with no mapping, or belonging to another
/// device, are ignored (§4.3 "layers with no matching mapping are ignored").
///
/// A slot with `lookahead.is_some()` and `foreground.is_none()` means: no
/// real foreground exists yet. Callers synthesize an empty device-specific
/// foreground carrying the lookahead slot (§4.3), since the empty shape is
/// device-specific and this helper stays generic.
pub fn resolve_foreground_and_lookahead(snapshot: &TimelineSnapshot, mappings: &Mappings, device: DeviceKind) -> HashMap<LayerId, ForegroundSlot> {
	let mut slots: HashMap<LayerId, ForegroundSlot> = HashMap::new();

	for (layer_id, object) in &snapshot.layers {
		let effective_layer = if object.is_lookahead {
			match &object.lookahead_for_layer {
				Some(target) => target.clone(),
				None => continue,
			}
		} else {
			layer_id.clone()
		};

		let Some(mapping) = mappings.get(&effective_layer) else {
			continue;
		};
		if mapping.device != device {
			continue;
		}

		let slot = slots.entry(effective_layer).or_default();
		if object.is_lookahead {
			slot.lookahead = Some(object.clone());
		} else {
			slot.foreground = Some(object.clone());
		}
	}

	slots
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Mapping;

	fn mappings_for(layer: &str, device: DeviceKind) -> Mappings {
		let mut m = Mappings::new();
		m.insert(layer.to_string(), Mapping::new(device, "dev-1"));
		m
	}

	#[test]
	fn unmapped_layers_are_ignored() {
		let mut snapshot = TimelineSnapshot::new(0);
		snapshot.layers.insert("L1".into(), ResolvedObject::new("o1", 0, serde_json::json!({})));

		let slots = resolve_foreground_and_lookahead(&snapshot, &Mappings::new(), DeviceKind::HttpSend);
		assert!(slots.is_empty());
	}

	#[test]
	fn lookahead_without_foreground_synthesizes_empty_slot_marker() {
		let mappings = mappings_for("M1", DeviceKind::HttpSend);
		let mut snapshot = TimelineSnapshot::new(0);
		snapshot.layers.insert(
			"preview".into(),
			ResolvedObject::new("o1", 0, serde_json::json!({})).as_lookahead_for("M1"),
		);

		let slots = resolve_foreground_and_lookahead(&snapshot, &mappings, DeviceKind::HttpSend);
		let slot = slots.get("M1").expect("slot for M1");
		assert!(slot.foreground.is_none());
		assert!(slot.lookahead.is_some());
	}

	#[test]
	fn foreground_and_lookahead_combine_on_same_effective_layer() {
		let mappings = mappings_for("M1", DeviceKind::HttpSend);
		let mut snapshot = TimelineSnapshot::new(0);
		snapshot.layers.insert("M1".into(), ResolvedObject::new("fg", 0, serde_json::json!({})));
		snapshot.layers.insert(
			"preview".into(),
			ResolvedObject::new("la", 0, serde_json::json!({})).as_lookahead_for("M1"),
		);

		let slots = resolve_foreground_and_lookahead(&snapshot, &mappings, DeviceKind::HttpSend);
		let slot = slots.get("M1").expect("slot for M1");
		assert_eq!(slot.foreground.as_ref().unwrap().id, "fg");
		assert_eq!(slot.lookahead.as_ref().unwrap().id, "la");
	}

	#[test]
	fn other_device_layers_are_excluded() {
		let mappings = mappings_for("M1", DeviceKind::VideoServer);
		let mut snapshot = TimelineSnapshot::new(0);
		snapshot.layers.insert("M1".into(), ResolvedObject::new("fg", 0, serde_json::json!({})));

		let slots = resolve_foreground_and_lookahead(&snapshot, &mappings, DeviceKind::HttpSend);
		assert!(slots.is_empty());
	}
}
