//! Walks a video-server façade through init, a timeline snapshot that binds
//! a port and plays a clip, and termination, logging each step.

use serde_json::json;
use std::sync::Arc;
use tracing::Level;
use tsr_device_videoserver::{JumpMode, VideoServerDeviceFacade, VideoServerInitOptions};
use tsr_facade::DeviceFacade;
use tsr_signals::ManualClock;
use tsr_state::{DeviceKind, Mapping, Mappings, ResolvedObject, TimelineSnapshot};

mod fake_server;
use fake_server::FakeVideoServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_target(false).init();

	let clock = Arc::new(ManualClock::new(0));
	let mut facade = VideoServerDeviceFacade::new(Arc::new(FakeVideoServer::default()), clock, vec!["pool-a".to_string()], JumpMode::Quality);

	facade
		.init(VideoServerInitOptions {
			gateway_url: "http://gateway.local".into(),
			isa_url: "http://isa.local".into(),
			zone_id: "zone-1".into(),
			server_id: "server-1".into(),
			make_ready_commands: Vec::new(),
			make_ready_does_reset: false,
		})
		.await?;

	println!("facade ready: {}", facade.connected());

	let mut mappings = Mappings::new();
	let mut mapping = Mapping::new(DeviceKind::VideoServer, "P1");
	mapping.extra = json!({ "channels": [1] });
	mappings.insert("L1".into(), mapping);

	let snapshot = TimelineSnapshot::new(10_000).with_layer("L1", ResolvedObject::new("o1", 10_000, json!({"title": "NEWS", "playing": true})));

	facade.handle_state(&snapshot, &mappings).await?;
	println!("queued commands for port P1, draining...");

	tokio::time::sleep(std::time::Duration::from_millis(50)).await;
	facade.terminate().await;

	Ok(())
}
