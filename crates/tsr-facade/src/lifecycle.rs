//! Device Façade lifecycle state machine (§4.6):
//! `UNINITIALIZED → INITIALIZING → READY ↔ DISCONNECTED → TERMINATED`.
//!
//! Grounded on `obs-websocket::core::state::ObsState::validate_transition`'s
//! match-on-`(current, transition)` shape.

use tracing::{debug, warn};
use tsr_signals::DeviceError;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	Uninitialized,
	Initializing,
	Ready,
	Disconnected,
	Terminated,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
	StartInit,
	InitSucceeded,
	InitFailed,
	ConnectionLost,
	Reconnected,
	Terminate,
}

pub struct Lifecycle {
	state: LifecycleState,
}

impl Lifecycle {
	pub const fn new() -> Self {
		Self {
			state: LifecycleState::Uninitialized,
		}
	}

	pub const fn state(&self) -> LifecycleState {
		self.state
	}

	pub fn apply(&mut self, transition: LifecycleTransition) -> Result<LifecycleState, DeviceError> {
		use LifecycleState::*;
		use LifecycleTransition::*;

		let next = match (self.state, transition) {
			(Uninitialized, StartInit) => Initializing,
			(Initializing, InitSucceeded) => Ready,
			(Initializing, InitFailed) => Disconnected,
			(Ready, ConnectionLost) => Disconnected,
			(Disconnected, Reconnected) => Ready,
			(Disconnected, StartInit) => Initializing,
			(Ready | Disconnected | Uninitialized | Initializing, Terminate) => Terminated,
			(from, transition) => {
				warn!(?from, ?transition, "illegal lifecycle transition");
				return Err(DeviceError::StateCorruption(format!("illegal lifecycle transition {transition:?} from {from:?}")));
			}
		};

		debug!(from = ?self.state, to = ?next, "lifecycle transition");
		self.state = next;
		Ok(next)
	}

	pub fn is_ready(&self) -> bool {
		self.state == LifecycleState::Ready
	}

	pub fn is_terminated(&self) -> bool {
		self.state == LifecycleState::Terminated
	}
}

impl Default for Lifecycle {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for LifecycleTransition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let label = match self {
			Self::StartInit => "StartInit",
			Self::InitSucceeded => "InitSucceeded",
			Self::InitFailed => "InitFailed",
			Self::ConnectionLost => "ConnectionLost",
			Self::Reconnected => "Reconnected",
			Self::Terminate => "Terminate",
		};
		f.write_str(label)
	}
}

impl std::fmt::Debug for LifecycleState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let label = match self {
			Self::Uninitialized => "UNINITIALIZED",
			Self::Initializing => "INITIALIZING",
			Self::Ready => "READY",
			Self::Disconnected => "DISCONNECTED",
			Self::Terminated => "TERMINATED",
		};
		f.write_str(label)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn happy_path_reaches_ready() {
		let mut lifecycle = Lifecycle::new();
		lifecycle.apply(LifecycleTransition::StartInit).unwrap();
		let state = lifecycle.apply(LifecycleTransition::InitSucceeded).unwrap();
		assert_eq!(state, LifecycleState::Ready);
		assert!(lifecycle.is_ready());
	}

	#[test]
	fn disconnect_then_reconnect_returns_to_ready() {
		let mut lifecycle = Lifecycle::new();
		lifecycle.apply(LifecycleTransition::StartInit).unwrap();
		lifecycle.apply(LifecycleTransition::InitSucceeded).unwrap();
		lifecycle.apply(LifecycleTransition::ConnectionLost).unwrap();
		assert_eq!(lifecycle.state(), LifecycleState::Disconnected);

		lifecycle.apply(LifecycleTransition::Reconnected).unwrap();
		assert!(lifecycle.is_ready());
	}

	#[test]
	fn illegal_transition_is_rejected() {
		let mut lifecycle = Lifecycle::new();
		let err = lifecycle.apply(LifecycleTransition::InitSucceeded).unwrap_err();
		assert!(matches!(err, DeviceError::StateCorruption(_)));
		assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
	}

	#[test]
	fn terminate_is_reachable_from_any_non_terminal_state() {
		for start in [LifecycleTransition::StartInit, LifecycleTransition::Terminate] {
			let mut lifecycle = Lifecycle::new();
			if start == LifecycleTransition::StartInit {
				lifecycle.apply(LifecycleTransition::StartInit).unwrap();
			}
			lifecycle.apply(LifecycleTransition::Terminate).unwrap();
			assert!(lifecycle.is_terminated());
		}
	}
}
