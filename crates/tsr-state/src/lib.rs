pub mod differ;
pub mod projector;
pub mod store;
pub mod types;

pub use differ::{order_commands, Differ, PrepareTiming};
pub use projector::{resolve_foreground_and_lookahead, ForegroundSlot, Projector};
pub use store::{DeviceState, StateStore};
pub use types::{Command, DeviceKind, LayerId, Mapping, Mappings, NextEvent, ResolvedObject, Timestamp, TimelineObjId, TimelineSnapshot};
