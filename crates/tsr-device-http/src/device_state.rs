//! HTTP device state shape (§3, §4.4): one entry per layer carrying the raw
//! command content, enough for deep-equality diffing.

use serde_json::Value;
use std::collections::HashMap;
use tsr_state::DeviceState;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpLayerState {
	pub content: Value,
	pub temporal_priority: Option<i32>,
	pub queue_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpDeviceState {
	pub layers: HashMap<String, HttpLayerState>,
}

impl DeviceState for HttpDeviceState {
	fn empty() -> Self {
		Self::default()
	}
}
