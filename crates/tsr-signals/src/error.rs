use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy for the timeline state resolver (see §7 of the design doc).
///
/// Propagation is the caller's responsibility: `Connection` and
/// `StateCorruption` are meant to bubble up via `FacadeEvent::Error`;
/// `Protocol` and non-retryable `Network` surface via `FacadeEvent::CommandError`;
/// `InvalidMapping` aborts the current `handle_state` pass without advancing
/// the State Store.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum DeviceError {
	#[error("connection error: {0}")]
	Connection(String),

	#[error("invalid mapping for layer '{layer}': {reason}")]
	InvalidMapping { layer: String, reason: String },

	#[error("protocol error: {0}")]
	Protocol(String),

	#[error("network error ({code:?}): {message}")]
	Network { code: NetworkErrorCode, message: String },

	#[error("state corruption: {0}")]
	StateCorruption(String),

	#[error("unsupported command: {0}")]
	UnsupportedCommand(String),
}

/// Socket-class error codes considered transient and retryable per §4.5/§7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkErrorCode {
	Etimedout,
	Econnreset,
	Eaddrinuse,
	Econnrefused,
	Epipe,
	Enotfound,
	Enetunreach,
	Ehostunreach,
	EaiAgain,
	Other,
}

impl NetworkErrorCode {
	/// Whether this code belongs to the retryable set from §4.5.
	pub fn is_retryable(self) -> bool {
		!matches!(self, Self::Other)
	}

	pub fn from_label(label: &str) -> Self {
		match label {
			"ETIMEDOUT" => Self::Etimedout,
			"ECONNRESET" => Self::Econnreset,
			"EADDRINUSE" => Self::Eaddrinuse,
			"ECONNREFUSED" => Self::Econnrefused,
			"EPIPE" => Self::Epipe,
			"ENOTFOUND" => Self::Enotfound,
			"ENETUNREACH" => Self::Enetunreach,
			"EHOSTUNREACH" => Self::Ehostunreach,
			"EAI_AGAIN" => Self::EaiAgain,
			_ => Self::Other,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn retryable_codes_match_spec_set() {
		for label in ["ETIMEDOUT", "ECONNRESET", "EADDRINUSE", "ECONNREFUSED", "EPIPE", "ENOTFOUND", "ENETUNREACH", "EHOSTUNREACH", "EAI_AGAIN"] {
			assert!(NetworkErrorCode::from_label(label).is_retryable(), "{label} should be retryable");
		}
		assert!(!NetworkErrorCode::from_label("EWEIRD").is_retryable());
	}
}
