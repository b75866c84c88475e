use crate::error::DeviceError;
use serde::{Deserialize, Serialize};

/// Minimal, wire-safe reference to a command for diagnostic events. The full
/// `Command` type lives in `tsr-state`; this crate stays a leaf dependency so
/// both device crates and the core scaffolding can depend on it without a
/// cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandContext {
	pub timeline_obj_id: String,
	pub queue_key: Option<String>,
	pub context: String,
}

impl CommandContext {
	pub fn new(timeline_obj_id: impl Into<String>, context: impl Into<String>) -> Self {
		Self {
			timeline_obj_id: timeline_obj_id.into(),
			queue_key: None,
			context: context.into(),
		}
	}

	pub fn with_queue_key(mut self, queue_key: impl Into<String>) -> Self {
		self.queue_key = Some(queue_key.into());
		self
	}
}

/// A recorded latency measurement for diagnosing scheduling drift (§6 `timeTrace`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeTrace {
	pub label: String,
	pub due_at: i64,
	pub fired_at: i64,
	pub completed_at: i64,
}

impl TimeTrace {
	pub fn fire_delay_ms(&self) -> i64 {
		self.fired_at - self.due_at
	}

	pub fn execution_ms(&self) -> i64 {
		self.completed_at - self.fired_at
	}
}

/// The façade signal set from §6: everything a device façade emits toward its
/// conductor besides its synchronous return values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FacadeEvent {
	Error { source: String, error: DeviceError },
	Warning(String),
	CommandError { error: DeviceError, command: CommandContext },
	Debug(serde_json::Value),
	ConnectionChanged(ConnectionStatus),
	ResetResolver,
	SlowCommand(String),
	TimeTrace(TimeTrace),
}

/// Mirrors `getStatus()`'s `{statusCode, messages, active}` shape (§4.6) so it
/// can travel over `ConnectionChanged` as well as be returned directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
	pub status_code: StatusCode,
	pub messages: Vec<String>,
	pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
	Good,
	Warning,
	Bad,
}

impl ConnectionStatus {
	pub fn good() -> Self {
		Self {
			status_code: StatusCode::Good,
			messages: Vec::new(),
			active: true,
		}
	}

	pub fn bad(message: impl Into<String>) -> Self {
		Self {
			status_code: StatusCode::Bad,
			messages: vec![message.into()],
			active: false,
		}
	}

	pub fn warning(message: impl Into<String>) -> Self {
		Self {
			status_code: StatusCode::Warning,
			messages: vec![message.into()],
			active: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn time_trace_computes_deltas() {
		let trace = TimeTrace {
			label: "play".into(),
			due_at: 1000,
			fired_at: 1010,
			completed_at: 1042,
		};
		assert_eq!(trace.fire_delay_ms(), 10);
		assert_eq!(trace.execution_ms(), 32);
	}

	#[test]
	fn status_constructors_set_active_flag() {
		assert!(ConnectionStatus::good().active);
		assert!(!ConnectionStatus::bad("down").active);
		assert!(ConnectionStatus::warning("slow").active);
	}
}
