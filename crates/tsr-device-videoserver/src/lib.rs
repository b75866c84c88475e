//! Reference Stateful Device: video-server ports/fragments (§4.4/4.5
//! stateful specifics, §6.6).

pub mod command;
pub mod device_state;
pub mod differ;
pub mod executor;
pub mod facade;
pub mod projector;
pub mod tracked;

pub use command::{JumpMode, VideoServerCommand, VideoServerCommandKind};
pub use device_state::{ClipState, PortId, PortState, VideoServerDeviceState};
pub use differ::VideoServerDiffer;
pub use executor::{FragmentSet, RemoteClip, VideoServerCollaborator, VideoServerExecutor, VideoServerTransportError};
pub use facade::{VideoServerDeviceFacade, VideoServerInitOptions};
pub use projector::VideoServerProjector;
pub use tracked::{ClipId, FragmentKey, LoadedFragments, TrackedPort};
