//! An in-memory stand-in for a real video-server protocol client, just
//! enough to let the demo binary run without a network.

use async_trait::async_trait;
use tsr_device_videoserver::{ClipId, FragmentSet, LoadedFragments, RemoteClip, VideoServerCollaborator, VideoServerTransportError};

#[derive(Default)]
pub struct FakeVideoServer;

#[async_trait]
impl VideoServerCollaborator for FakeVideoServer {
	async fn get_server(&self) -> Result<(), VideoServerTransportError> {
		Ok(())
	}

	async fn create_port(&self, port_id: &str, channel: u32) -> Result<(), VideoServerTransportError> {
		tracing::info!(port_id, channel, "create_port");
		Ok(())
	}

	async fn release_port(&self, port_id: &str) -> Result<(), VideoServerTransportError> {
		tracing::info!(port_id, "release_port");
		Ok(())
	}

	async fn search_clip(&self, title: &str) -> Result<ClipId, VideoServerTransportError> {
		Ok(format!("clip-{title}"))
	}

	async fn get_clip(&self, clip_id: &ClipId) -> Result<RemoteClip, VideoServerTransportError> {
		Ok(RemoteClip {
			id: clip_id.clone(),
			pools: vec!["pool-a".to_string()],
			in_point_frames: 0,
			out_point_frames: 500,
		})
	}

	async fn get_clip_fragments(&self, _clip_id: &ClipId, in_point_frames: i64, out_point_frames: i64) -> Result<FragmentSet, VideoServerTransportError> {
		Ok(FragmentSet { in_point_frames, out_point_frames })
	}

	async fn load_fragments_onto_port(&self, port_id: &str, fragments: FragmentSet, end_of_data: i64) -> Result<LoadedFragments, VideoServerTransportError> {
		tracing::info!(port_id, end_of_data, "load_fragments_onto_port");
		Ok(LoadedFragments {
			port_in_point: end_of_data,
			port_out_point: end_of_data + (fragments.out_point_frames - fragments.in_point_frames),
		})
	}

	async fn port_prepare_jump(&self, port_id: &str, offset: i64) -> Result<(), VideoServerTransportError> {
		tracing::debug!(port_id, offset, "port_prepare_jump");
		Ok(())
	}

	async fn port_trigger_jump(&self, port_id: &str) -> Result<(), VideoServerTransportError> {
		tracing::debug!(port_id, "port_trigger_jump");
		Ok(())
	}

	async fn port_hard_jump(&self, port_id: &str, offset: i64) -> Result<(), VideoServerTransportError> {
		tracing::debug!(port_id, offset, "port_hard_jump");
		Ok(())
	}

	async fn port_stop(&self, port_id: &str, at_offset: Option<i64>) -> Result<(), VideoServerTransportError> {
		tracing::debug!(port_id, ?at_offset, "port_stop");
		Ok(())
	}

	async fn port_play(&self, port_id: &str) -> Result<(), VideoServerTransportError> {
		tracing::info!(port_id, "port_play");
		Ok(())
	}

	async fn port_clear(&self, port_id: &str) -> Result<(), VideoServerTransportError> {
		tracing::info!(port_id, "port_clear");
		Ok(())
	}
}
