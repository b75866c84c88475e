//! Reference Simple Device: HTTP sender (§4.4/4.5).

pub mod command;
pub mod device_state;
pub mod differ;
pub mod executor;
pub mod facade;
pub mod projector;

pub use command::{HttpCommand, HttpMethod};
pub use device_state::{HttpDeviceState, HttpLayerState};
pub use differ::HttpDiffer;
pub use executor::{HttpCollaborator, HttpExecutor, HttpResponse, HttpTransportError};
pub use facade::{HttpDeviceFacade, HttpInitOptions};
pub use projector::HttpProjector;
