pub mod clock;
pub mod error;
pub mod event;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DeviceError, NetworkErrorCode};
pub use event::{CommandContext, ConnectionStatus, FacadeEvent, StatusCode, TimeTrace};
