//! Stateful device façade (§4.6, §6.6): composes `TimedDeviceBase` with the
//! video-server projector/differ/executor trio.

use crate::command::{JumpMode, VideoServerCommand};
use crate::device_state::VideoServerDeviceState;
use crate::differ::VideoServerDiffer;
use crate::executor::{VideoServerCollaborator, VideoServerExecutor, DEFAULT_CLIP_CACHE_TTL_MS};
use crate::projector::VideoServerProjector;
use async_trait::async_trait;
use std::sync::Arc;
use tsr_facade::{DeviceFacade, LifecycleTransition, TimedDeviceBase};
use tsr_queue::DeliveryMode;
use tsr_signals::{Clock, CommandContext, ConnectionStatus, DeviceError, FacadeEvent};
use tsr_state::{DeviceState, Mappings, Projector, Timestamp, TimelineSnapshot};

/// Connection identity (§6 "gatewayUrl, ISAUrl, zoneId, serverId (Quantel) —
/// connection identity (all required)"). Pool visibility and jump mode are
/// fixed at construction since the executor needs them up front, same as
/// `HttpDeviceFacade::new` taking `resend_time_ms` rather than `init`.
#[derive(Debug, Clone, Default)]
pub struct VideoServerInitOptions {
	pub gateway_url: String,
	pub isa_url: String,
	pub zone_id: String,
	pub server_id: String,
	/// §6 `makeReadyCommands`: replayed, in order, on every `make_ready(true)`.
	pub make_ready_commands: Vec<VideoServerCommand>,
	/// §6 `makeReadyDoesReset`: also `clear_states()` on `make_ready(true)`.
	pub make_ready_does_reset: bool,
}

impl VideoServerInitOptions {
	fn validate(&self) -> Result<(), DeviceError> {
		if self.gateway_url.is_empty() || self.isa_url.is_empty() || self.zone_id.is_empty() || self.server_id.is_empty() {
			return Err(DeviceError::Connection("gatewayUrl, ISAUrl, zoneId and serverId are all required".to_string()));
		}
		Ok(())
	}
}

pub struct VideoServerDeviceFacade<C: VideoServerCollaborator> {
	base: TimedDeviceBase<VideoServerDeviceState>,
	executor: Arc<VideoServerExecutor<C>>,
	differ: VideoServerDiffer,
	make_ready_commands: Vec<VideoServerCommand>,
	make_ready_does_reset: bool,
}

impl<C: VideoServerCollaborator> VideoServerDeviceFacade<C> {
	pub fn new(collaborator: Arc<C>, clock: Arc<dyn Clock>, visible_pools: Vec<String>, jump_mode: JumpMode) -> Self {
		let executor = Arc::new(VideoServerExecutor::new(collaborator, clock.clone(), visible_pools, jump_mode, DEFAULT_CLIP_CACHE_TTL_MS));
		Self {
			base: TimedDeviceBase::new(DeliveryMode::InOrder, clock),
			executor,
			differ: VideoServerDiffer::default(),
			make_ready_commands: Vec::new(),
			make_ready_does_reset: false,
		}
	}

	pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<FacadeEvent> {
		self.base.subscribe()
	}

	async fn dispatch(&mut self, command: VideoServerCommand) {
		let executor = self.executor.clone();
		let events = self.base.events_sender();
		let queue_key = command.queue_key.clone();
		let context = command.context.clone();
		let fire_time = command.execute_at;
		let command_ctx = CommandContext::new(command.timeline_obj_id.clone(), command.context.clone());
		let command_ctx = match &command.queue_key {
			Some(key) => command_ctx.with_queue_key(key.clone()),
			None => command_ctx,
		};
		self.base
			.queue
			.queue(fire_time, queue_key, context, move || async move {
				match executor.execute(command).await {
					Ok(()) => Ok(()),
					Err(error) => {
						let _ = events.send(FacadeEvent::CommandError { error: error.clone(), command: command_ctx });
						Err(error.to_string())
					}
				}
			})
			.await;
	}
}

#[async_trait]
impl<C: VideoServerCollaborator> DeviceFacade for VideoServerDeviceFacade<C> {
	type InitOptions = VideoServerInitOptions;

	async fn init(&mut self, opts: Self::InitOptions) -> Result<(), DeviceError> {
		opts.validate()?;
		self.base.lifecycle.apply(LifecycleTransition::StartInit)?;
		self.make_ready_commands = opts.make_ready_commands;
		self.make_ready_does_reset = opts.make_ready_does_reset;

		match self.executor.check_connection().await {
			Ok(()) => {
				self.base.lifecycle.apply(LifecycleTransition::InitSucceeded)?;
				self.base.emit(FacadeEvent::ConnectionChanged(self.get_status()));
				Ok(())
			}
			Err(err) => {
				self.base.lifecycle.apply(LifecycleTransition::InitFailed)?;
				self.base.emit(FacadeEvent::ConnectionChanged(self.get_status()));
				Err(err)
			}
		}
	}

	async fn handle_state(&mut self, snapshot: &TimelineSnapshot, mappings: &Mappings) -> Result<(), DeviceError> {
		let previous_time = self.base.previous_time(snapshot.time);
		let (old_state_time, old_state) = self
			.base
			.store
			.get_entry_before(previous_time)
			.map(|(t, s)| (t, s.clone()))
			.unwrap_or((0, VideoServerDeviceState::empty()));

		let new_state = VideoServerProjector.project(snapshot, mappings)?;
		let commands = self.differ.diff(&old_state, old_state_time, &new_state, snapshot.time);

		for command in commands {
			self.dispatch(command).await;
		}

		self.base.store.set_state(new_state, snapshot.time);
		Ok(())
	}

	async fn clear_future(&mut self, t: Timestamp) {
		self.base.clear_future(t).await;
	}

	async fn prepare_for_handle_state(&mut self, t: Timestamp) {
		self.base.prepare_for_handle_state(t).await;
	}

	/// §6 `makeReadyCommands`/`makeReadyDoesReset`: on `ok_to_destroy`, replay
	/// any configured make-ready commands, then reset the State Store only if
	/// the device was configured to do so — the two are independent options.
	async fn make_ready(&mut self, ok_to_destroy: bool) -> Result<(), DeviceError> {
		if ok_to_destroy {
			for command in self.make_ready_commands.clone() {
				self.dispatch(command).await;
			}
			if self.make_ready_does_reset {
				self.base.store.clear_states();
			}
		}
		Ok(())
	}

	async fn terminate(&mut self) {
		self.base.terminate().await;
	}

	fn get_status(&self) -> ConnectionStatus {
		if self.base.lifecycle.is_terminated() {
			ConnectionStatus::bad("terminated")
		} else if self.base.connected() {
			ConnectionStatus::good()
		} else {
			ConnectionStatus::warning("not ready")
		}
	}

	fn connected(&self) -> bool {
		self.base.connected()
	}
}
