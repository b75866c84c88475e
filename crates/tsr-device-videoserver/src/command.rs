//! Video-server command kinds (§4.4 stateful-device specifics).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoServerCommandKind {
	SetupPort,
	LoadFragments,
	Play,
	Pause,
	Clear,
	ReleasePort,
}

/// `tsr_state::Command<K>` specialized to this device: `kind` is one of the
/// port operations above, `payload` carries the operation's arguments as a
/// loose JSON object (`portId`, `channel`, `title`, `playTime`, ...).
pub type VideoServerCommand = tsr_state::Command<VideoServerCommandKind>;

/// Control-mode selector biasing toward clean transitions (QUALITY) vs
/// minimum latency (SPEED) when preparing a port jump (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JumpMode {
	#[default]
	Quality,
	Speed,
}
