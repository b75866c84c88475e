//! Stateful executor (§4.5 "Stateful executor actions"): interprets each
//! `VideoServerCommand` against Tracked State and drives the video-server
//! protocol collaborator.
//!
//! Grounded on `tsr-device-http::executor::HttpExecutor`'s shape (a
//! collaborator trait behind `Arc`, Tracked State for idempotent collapse,
//! a `Clock` for deterministic timing), generalized from a stateless
//! fingerprint check to a full per-port tracked model — this module is the
//! novel 40% of the system spec.md §2 calls out, built fresh since no
//! teacher crate implements port/fragment/jump control.

use crate::command::{JumpMode, VideoServerCommand, VideoServerCommandKind};
use crate::tracked::{ClipId, FragmentKey, LoadedFragments, TrackedPort};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tsr_facade::{TrackedState, TtlCache};
use tsr_signals::{Clock, DeviceError, NetworkErrorCode};

/// `|trackedJumpOffset - jumpToOffset| > JUMP_ERROR_MARGIN` invalidates a
/// prepared jump (§4.5 `PLAY_CLIP`/`PAUSE_CLIP`).
pub const JUMP_ERROR_MARGIN_FRAMES: i64 = 5;
/// Wait after preparing a soft jump before the optional stop+trigger, in
/// both PLAY and PAUSE modes (§9 Open Question: preserved for PAUSE too, to
/// match observed behavior, even though no subsequent frame advance is
/// expected there).
pub const SOFT_JUMP_WAIT_MS: i64 = 100;
/// Default TTL for the clip-title-to-id lookup cache (§4.5 `LOAD_FRAGMENTS`).
pub const DEFAULT_CLIP_CACHE_TTL_MS: i64 = 30_000;

#[derive(Debug, Clone)]
pub struct RemoteClip {
	pub id: ClipId,
	pub pools: Vec<String>,
	pub in_point_frames: i64,
	pub out_point_frames: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct FragmentSet {
	pub in_point_frames: i64,
	pub out_point_frames: i64,
}

#[derive(Debug, Clone)]
pub enum VideoServerTransportError {
	Network(NetworkErrorCode),
	/// A 404-shaped response; non-fatal for `RELEASE_PORT` (§4.5).
	NotFound,
	Protocol(String),
}

/// The narrow protocol surface the executor drives (§6). Concrete
/// AMCP/SDI clients stay out of scope (§1 "concrete device protocol codecs").
#[async_trait]
pub trait VideoServerCollaborator: Send + Sync + 'static {
	async fn get_server(&self) -> Result<(), VideoServerTransportError>;
	async fn create_port(&self, port_id: &str, channel: u32) -> Result<(), VideoServerTransportError>;
	async fn release_port(&self, port_id: &str) -> Result<(), VideoServerTransportError>;
	async fn search_clip(&self, title: &str) -> Result<ClipId, VideoServerTransportError>;
	async fn get_clip(&self, clip_id: &ClipId) -> Result<RemoteClip, VideoServerTransportError>;
	async fn get_clip_fragments(&self, clip_id: &ClipId, in_point_frames: i64, out_point_frames: i64) -> Result<FragmentSet, VideoServerTransportError>;
	async fn load_fragments_onto_port(&self, port_id: &str, fragments: FragmentSet, end_of_data: i64) -> Result<LoadedFragments, VideoServerTransportError>;
	async fn port_prepare_jump(&self, port_id: &str, offset: i64) -> Result<(), VideoServerTransportError>;
	async fn port_trigger_jump(&self, port_id: &str) -> Result<(), VideoServerTransportError>;
	async fn port_hard_jump(&self, port_id: &str, offset: i64) -> Result<(), VideoServerTransportError>;
	/// `at_offset: None` stops immediately; `Some(offset)` schedules the
	/// remote device to stop once it reaches that offset.
	async fn port_stop(&self, port_id: &str, at_offset: Option<i64>) -> Result<(), VideoServerTransportError>;
	async fn port_play(&self, port_id: &str) -> Result<(), VideoServerTransportError>;
	async fn port_clear(&self, port_id: &str) -> Result<(), VideoServerTransportError>;
}

fn to_device_error(err: VideoServerTransportError) -> DeviceError {
	match err {
		VideoServerTransportError::Network(code) => DeviceError::Network {
			code,
			message: "video-server transport error".to_string(),
		},
		VideoServerTransportError::NotFound => DeviceError::Protocol("resource not found".to_string()),
		VideoServerTransportError::Protocol(message) => DeviceError::Protocol(message),
	}
}

fn payload_str<'a>(payload: &'a Value, key: &str) -> &'a str {
	payload.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}

pub struct VideoServerExecutor<C: VideoServerCollaborator> {
	collaborator: Arc<C>,
	tracked: TrackedState<String, TrackedPort>,
	clip_cache: TtlCache<String, ClipId>,
	clock: Arc<dyn Clock>,
	visible_pools: Vec<String>,
	jump_mode: JumpMode,
}

impl<C: VideoServerCollaborator> VideoServerExecutor<C> {
	pub fn new(collaborator: Arc<C>, clock: Arc<dyn Clock>, visible_pools: Vec<String>, jump_mode: JumpMode, clip_cache_ttl_ms: i64) -> Self {
		Self {
			collaborator,
			tracked: TrackedState::new(),
			clip_cache: TtlCache::new(clip_cache_ttl_ms, clock.clone()),
			clock,
			visible_pools,
			jump_mode,
		}
	}

	pub fn tracked_port(&self, port_id: &str) -> Option<TrackedPort> {
		self.tracked.get(&port_id.to_string())
	}

	/// Validates connectivity to the video server, used by the façade's
	/// `init` (§4.6 "connect to the device (if applicable)").
	pub async fn check_connection(&self) -> Result<(), DeviceError> {
		self.collaborator.get_server().await.map_err(to_device_error)
	}

	pub async fn execute(&self, command: VideoServerCommand) -> Result<(), DeviceError> {
		let port_id = payload_str(&command.payload, "portId").to_string();
		match command.kind {
			VideoServerCommandKind::SetupPort => {
				let channel = command.payload.get("channel").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
				self.setup_port(&port_id, channel).await
			}
			VideoServerCommandKind::LoadFragments => {
				let title = payload_str(&command.payload, "title").to_string();
				let time_of_play = command.payload.get("timeOfPlay").and_then(|v| v.as_i64()).unwrap_or(command.execute_at);
				self.load_fragments(&port_id, &title, time_of_play).await
			}
			VideoServerCommandKind::Play | VideoServerCommandKind::Pause => {
				let play_time = command.payload.get("playTime").and_then(|v| v.as_i64()).unwrap_or(command.execute_at);
				let pause_time = command.payload.get("pauseTime").and_then(|v| v.as_i64());
				let fps = command.payload.get("fps").and_then(|v| v.as_f64()).unwrap_or(50.0);
				let is_play = command.kind == VideoServerCommandKind::Play;
				self.play_or_pause(&port_id, play_time, pause_time, fps, is_play).await
			}
			VideoServerCommandKind::Clear => self.clear_clip(&port_id).await,
			VideoServerCommandKind::ReleasePort => self.release_port(&port_id).await,
		}
	}

	/// §4.5 `SETUP_PORT`: recreate the remote port when the tracked binding
	/// is missing or bound to a different channel; idempotent otherwise.
	async fn setup_port(&self, port_id: &str, channel: u32) -> Result<(), DeviceError> {
		let needs_recreate = match self.tracked.get(&port_id.to_string()) {
			Some(existing) => existing.channel != channel,
			None => true,
		};
		if !needs_recreate {
			return Ok(());
		}

		if self.tracked.contains(&port_id.to_string()) {
			debug!(port_id, channel, "channel binding changed, releasing old port first");
			match self.collaborator.release_port(port_id).await {
				Ok(()) | Err(VideoServerTransportError::NotFound) => {}
				Err(err) => return Err(to_device_error(err)),
			}
		}

		self.collaborator.create_port(port_id, channel).await.map_err(to_device_error)?;
		self.tracked.set(port_id.to_string(), TrackedPort::new(channel));
		Ok(())
	}

	/// §4.5 `LOAD_FRAGMENTS`: resolve the clip title via the TTL cache,
	/// validate pool visibility, reuse an already-loaded fragment set when
	/// the `(inPointFrames, outPointFrames)` pair matches, otherwise fetch
	/// and load it. If there's lead time before `timeOfPlay`, additionally
	/// contain the previously-loaded clip and stage a soft jump.
	async fn load_fragments(&self, port_id: &str, title: &str, time_of_play: i64) -> Result<(), DeviceError> {
		let collaborator = self.collaborator.clone();
		let title_owned = title.to_string();
		let clip_id = self
			.clip_cache
			.get_set_fallible(title_owned.clone(), || async move { collaborator.search_clip(&title_owned).await })
			.await
			.map_err(to_device_error)?;

		let clip = self.collaborator.get_clip(&clip_id).await.map_err(to_device_error)?;
		if !clip.pools.iter().any(|pool| self.visible_pools.contains(pool)) {
			return Err(DeviceError::StateCorruption(format!("clip '{title}' is not on a pool this server can see")));
		}

		let key = FragmentKey {
			in_point_frames: clip.in_point_frames,
			out_point_frames: clip.out_point_frames,
		};

		let already_loaded = self.tracked.get(&port_id.to_string()).and_then(|p| p.loaded_fragments.get(&key).copied());

		let loaded = match already_loaded {
			Some(loaded) => loaded,
			None => {
				let fragments = self
					.collaborator
					.get_clip_fragments(&clip_id, clip.in_point_frames, clip.out_point_frames)
					.await
					.map_err(to_device_error)?;
				let end_of_data = self.tracked.get(&port_id.to_string()).map(|p| p.offset).unwrap_or(0);
				let loaded = self.collaborator.load_fragments_onto_port(port_id, fragments, end_of_data).await.map_err(to_device_error)?;
				self.tracked.update(&port_id.to_string(), |p| {
					p.loaded_fragments.insert(key, loaded);
					p.offset = end_of_data + (clip.out_point_frames - clip.in_point_frames);
					p.active = Some(loaded);
				});
				loaded
			}
		};

		self.tracked.update(&port_id.to_string(), |p| p.active = Some(loaded));

		let now = self.clock.now_ms();
		if time_of_play - now > 0 {
			self.collaborator.port_stop(port_id, Some(loaded.port_in_point - 1)).await.map_err(to_device_error)?;
			self.collaborator.port_prepare_jump(port_id, loaded.port_in_point).await.map_err(to_device_error)?;
			self.tracked.update(&port_id.to_string(), |p| p.jump_offset = Some(loaded.port_in_point));
		}

		Ok(())
	}

	/// §4.5 `PLAY_CLIP`/`PAUSE_CLIP`: compute the desired jump offset,
	/// reuse a prepared jump if it's still within the error margin,
	/// otherwise stage one fresh per the configured jump mode.
	async fn play_or_pause(&self, port_id: &str, play_time: i64, pause_time: Option<i64>, fps: f64, is_play: bool) -> Result<(), DeviceError> {
		let tracked = self
			.tracked
			.get(&port_id.to_string())
			.ok_or_else(|| DeviceError::StateCorruption(format!("no tracked port {port_id}")))?;
		let active = tracked
			.active
			.ok_or_else(|| DeviceError::StateCorruption(format!("no fragments loaded on port {port_id}")))?;

		let now = self.clock.now_ms();
		let reference_time = pause_time.unwrap_or(now);
		let elapsed_ms = (reference_time - play_time).max(0);
		let jump_to_offset = (active.port_in_point as f64 + (elapsed_ms as f64) * fps / 1000.0).floor() as i64;

		let jump_valid = tracked.jump_offset.is_some_and(|prepared| (prepared - jump_to_offset).abs() <= JUMP_ERROR_MARGIN_FRAMES);

		if jump_valid {
			debug!(port_id, jump_to_offset, "reusing prepared jump");
			if !is_play {
				self.collaborator.port_stop(port_id, None).await.map_err(to_device_error)?;
			}
			self.collaborator.port_trigger_jump(port_id).await.map_err(to_device_error)?;
		} else {
			warn!(port_id, jump_to_offset, jump_mode = ?self.jump_mode, "no usable prepared jump, falling back");
			self.tracked.update(&port_id.to_string(), |p| p.jump_offset = None);
			match self.jump_mode {
				JumpMode::Quality => {
					self.collaborator.port_prepare_jump(port_id, jump_to_offset).await.map_err(to_device_error)?;
					tokio::time::sleep(Duration::from_millis(SOFT_JUMP_WAIT_MS as u64)).await;
					if !is_play {
						self.collaborator.port_stop(port_id, None).await.map_err(to_device_error)?;
					}
					self.collaborator.port_trigger_jump(port_id).await.map_err(to_device_error)?;
				}
				JumpMode::Speed => {
					self.collaborator.port_hard_jump(port_id, jump_to_offset).await.map_err(to_device_error)?;
				}
			}
		}

		if is_play {
			self.collaborator.port_play(port_id).await.map_err(to_device_error)?;
			self.collaborator.port_stop(port_id, Some(active.port_out_point)).await.map_err(to_device_error)?;
			self.tracked.update(&port_id.to_string(), |p| {
				p.playing = true;
				p.jump_offset = None;
				p.scheduled_stop = Some(active.port_out_point);
			});
		} else {
			self.tracked.update(&port_id.to_string(), |p| {
				p.playing = false;
				p.jump_offset = None;
			});
		}

		Ok(())
	}

	/// §4.5 `CLEAR_CLIP`.
	async fn clear_clip(&self, port_id: &str) -> Result<(), DeviceError> {
		self.collaborator.port_clear(port_id).await.map_err(to_device_error)?;
		self.tracked.update(&port_id.to_string(), |p| {
			p.jump_offset = None;
			p.loaded_fragments.clear();
			p.active = None;
			p.scheduled_stop = None;
			p.playing = false;
		});
		Ok(())
	}

	/// §4.5 `RELEASE_PORT`: a 404 on release is non-fatal (already released).
	async fn release_port(&self, port_id: &str) -> Result<(), DeviceError> {
		match self.collaborator.release_port(port_id).await {
			Ok(()) | Err(VideoServerTransportError::NotFound) => {}
			Err(err) => return Err(to_device_error(err)),
		}
		self.tracked.remove(&port_id.to_string());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use tokio::sync::Mutex as AsyncMutex;
	use tsr_signals::ManualClock;

	struct FakeCollaborator {
		release_calls: AtomicU32,
		play_calls: AtomicU32,
		search_calls: AtomicU32,
		clip_pools: Vec<String>,
		fragments_state: AsyncMutex<i64>,
		fail_search_first_n: u32,
	}

	impl FakeCollaborator {
		fn new(clip_pools: Vec<String>) -> Self {
			Self {
				release_calls: AtomicU32::new(0),
				play_calls: AtomicU32::new(0),
				search_calls: AtomicU32::new(0),
				clip_pools,
				fragments_state: AsyncMutex::new(0),
				fail_search_first_n: 0,
			}
		}
	}

	#[async_trait]
	impl VideoServerCollaborator for FakeCollaborator {
		async fn get_server(&self) -> Result<(), VideoServerTransportError> {
			Ok(())
		}
		async fn create_port(&self, _port_id: &str, _channel: u32) -> Result<(), VideoServerTransportError> {
			Ok(())
		}
		async fn release_port(&self, _port_id: &str) -> Result<(), VideoServerTransportError> {
			self.release_calls.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
		async fn search_clip(&self, title: &str) -> Result<ClipId, VideoServerTransportError> {
			let n = self.search_calls.fetch_add(1, Ordering::SeqCst);
			if n < self.fail_search_first_n {
				Err(VideoServerTransportError::Protocol("transient search failure".to_string()))
			} else {
				Ok(format!("clip-{title}"))
			}
		}
		async fn get_clip(&self, clip_id: &ClipId) -> Result<RemoteClip, VideoServerTransportError> {
			Ok(RemoteClip {
				id: clip_id.clone(),
				pools: self.clip_pools.clone(),
				in_point_frames: 0,
				out_point_frames: 500,
			})
		}
		async fn get_clip_fragments(&self, _clip_id: &ClipId, in_point_frames: i64, out_point_frames: i64) -> Result<FragmentSet, VideoServerTransportError> {
			Ok(FragmentSet { in_point_frames, out_point_frames })
		}
		async fn load_fragments_onto_port(&self, _port_id: &str, fragments: FragmentSet, end_of_data: i64) -> Result<LoadedFragments, VideoServerTransportError> {
			let mut calls = self.fragments_state.lock().await;
			*calls += 1;
			Ok(LoadedFragments {
				port_in_point: end_of_data,
				port_out_point: end_of_data + (fragments.out_point_frames - fragments.in_point_frames),
			})
		}
		async fn port_prepare_jump(&self, _port_id: &str, _offset: i64) -> Result<(), VideoServerTransportError> {
			Ok(())
		}
		async fn port_trigger_jump(&self, _port_id: &str) -> Result<(), VideoServerTransportError> {
			Ok(())
		}
		async fn port_hard_jump(&self, _port_id: &str, _offset: i64) -> Result<(), VideoServerTransportError> {
			Ok(())
		}
		async fn port_stop(&self, _port_id: &str, _at_offset: Option<i64>) -> Result<(), VideoServerTransportError> {
			Ok(())
		}
		async fn port_play(&self, _port_id: &str) -> Result<(), VideoServerTransportError> {
			self.play_calls.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
		async fn port_clear(&self, _port_id: &str) -> Result<(), VideoServerTransportError> {
			Ok(())
		}
	}

	fn executor(pools: Vec<String>) -> VideoServerExecutor<FakeCollaborator> {
		VideoServerExecutor::new(Arc::new(FakeCollaborator::new(pools)), Arc::new(ManualClock::new(0)), vec!["pool-a".to_string()], JumpMode::Quality, DEFAULT_CLIP_CACHE_TTL_MS)
	}

	#[tokio::test]
	async fn setup_port_creates_tracked_entry() {
		let exec = executor(vec!["pool-a".to_string()]);
		exec.setup_port("P1", 1).await.unwrap();
		let tracked = exec.tracked_port("P1").unwrap();
		assert_eq!(tracked.channel, 1);
		assert!(tracked.loaded_fragments.is_empty());
		assert!(!tracked.playing);
	}

	#[tokio::test]
	async fn setup_port_is_idempotent_for_same_channel() {
		let exec = executor(vec!["pool-a".to_string()]);
		exec.setup_port("P1", 1).await.unwrap();
		exec.setup_port("P1", 1).await.unwrap();
		assert_eq!(exec.collaborator.release_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn setup_port_releases_before_recreating_on_channel_change() {
		let exec = executor(vec!["pool-a".to_string()]);
		exec.setup_port("P1", 1).await.unwrap();
		exec.setup_port("P1", 2).await.unwrap();
		assert_eq!(exec.collaborator.release_calls.load(Ordering::SeqCst), 1);
		assert_eq!(exec.tracked_port("P1").unwrap().channel, 2);
	}

	#[tokio::test]
	async fn load_fragments_rejects_clip_on_invisible_pool() {
		let exec = executor(vec!["pool-b".to_string()]);
		exec.setup_port("P1", 1).await.unwrap();
		let err = exec.load_fragments("P1", "NEWS", 10_000).await.unwrap_err();
		assert!(matches!(err, DeviceError::StateCorruption(_)));
	}

	#[tokio::test]
	async fn load_fragments_sets_active_fragment_set() {
		let exec = executor(vec!["pool-a".to_string()]);
		exec.setup_port("P1", 1).await.unwrap();
		exec.load_fragments("P1", "NEWS", 10_000).await.unwrap();
		assert!(exec.tracked_port("P1").unwrap().active.is_some());
	}

	#[tokio::test]
	async fn transient_search_failure_is_not_cached_and_succeeds_on_retry() {
		let collaborator = Arc::new(FakeCollaborator {
			fail_search_first_n: 1,
			..FakeCollaborator::new(vec!["pool-a".to_string()])
		});
		let exec = VideoServerExecutor::new(collaborator, Arc::new(ManualClock::new(0)), vec!["pool-a".to_string()], JumpMode::Quality, DEFAULT_CLIP_CACHE_TTL_MS);
		exec.setup_port("P1", 1).await.unwrap();

		let err = exec.load_fragments("P1", "NEWS", 10_000).await.unwrap_err();
		assert!(matches!(err, DeviceError::Protocol(_)));
		assert!(exec.clip_cache.get(&"NEWS".to_string()).is_none());

		exec.load_fragments("P1", "NEWS", 10_000).await.unwrap();
		assert!(exec.clip_cache.get(&"NEWS".to_string()).is_some());
	}

	#[tokio::test]
	async fn play_then_clear_resets_loaded_fragments_and_jump_offset() {
		let exec = executor(vec!["pool-a".to_string()]);
		exec.setup_port("P1", 1).await.unwrap();
		exec.load_fragments("P1", "NEWS", 10_000).await.unwrap();
		exec.play_or_pause("P1", 10_000, None, 50.0, true).await.unwrap();

		let tracked = exec.tracked_port("P1").unwrap();
		assert!(tracked.playing);
		assert!(!tracked.loaded_fragments.is_empty());

		exec.clear_clip("P1").await.unwrap();
		let tracked = exec.tracked_port("P1").unwrap();
		assert!(tracked.loaded_fragments.is_empty());
		assert!(tracked.jump_offset.is_none());
		assert!(tracked.active.is_none());
		assert!(!tracked.playing);
	}

	#[tokio::test]
	async fn release_port_on_missing_port_is_non_fatal() {
		let exec = executor(vec!["pool-a".to_string()]);
		exec.release_port("ghost").await.unwrap();
	}

	#[tokio::test]
	async fn play_calls_port_play_exactly_once() {
		let exec = executor(vec!["pool-a".to_string()]);
		exec.setup_port("P1", 1).await.unwrap();
		exec.load_fragments("P1", "NEWS", 10_000).await.unwrap();
		exec.play_or_pause("P1", 10_000, None, 50.0, true).await.unwrap();
		assert_eq!(exec.collaborator.play_calls.load(Ordering::SeqCst), 1);
	}
}
