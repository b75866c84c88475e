//! HTTP device façade (§4.6, §6.5): composes `TimedDeviceBase` with the HTTP
//! projector/differ/executor trio to implement `DeviceFacade`.

use crate::device_state::HttpDeviceState;
use crate::differ::HttpDiffer;
use crate::executor::{HttpCollaborator, HttpExecutor};
use crate::projector::HttpProjector;
use async_trait::async_trait;
use std::sync::Arc;
use tsr_facade::{DeviceFacade, TimedDeviceBase};
use tsr_queue::DeliveryMode;
use tsr_signals::{Clock, CommandContext, ConnectionStatus, DeviceError, FacadeEvent};
use tsr_state::{DeviceState, Differ, Mappings, Projector, Timestamp, TimelineSnapshot};

use crate::command::HttpCommand;

/// HTTP devices have no connect handshake; `init` only carries the resend
/// policy an operator may want to tune per device instance.
#[derive(Debug, Clone, Default)]
pub struct HttpInitOptions {
	pub resend_time_ms: Option<i64>,
	/// §6 `makeReadyCommands`: replayed, in order, on every `make_ready(true)`.
	pub make_ready_commands: Vec<HttpCommand>,
	/// §6 `makeReadyDoesReset`: also `clear_states()` on `make_ready(true)`.
	pub make_ready_does_reset: bool,
}

pub struct HttpDeviceFacade<C: HttpCollaborator> {
	base: TimedDeviceBase<HttpDeviceState>,
	executor: Arc<HttpExecutor<C>>,
	make_ready_commands: Vec<HttpCommand>,
	make_ready_does_reset: bool,
}

impl<C: HttpCollaborator> HttpDeviceFacade<C> {
	pub fn new(collaborator: Arc<C>, clock: Arc<dyn Clock>, resend_time_ms: Option<i64>) -> Self {
		let base = TimedDeviceBase::new(DeliveryMode::InOrder, clock.clone());
		let executor = Arc::new(HttpExecutor::new(collaborator, clock, resend_time_ms, base.events_sender()));
		Self {
			base,
			executor,
			make_ready_commands: Vec::new(),
			make_ready_does_reset: false,
		}
	}

	pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<tsr_signals::FacadeEvent> {
		self.base.subscribe()
	}

	async fn dispatch(&mut self, command: HttpCommand) {
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
impl<C: HttpCollaborator> DeviceFacade for HttpDeviceFacade<C> {
	type InitOptions = HttpInitOptions;

	async fn init(&mut self, opts: Self::InitOptions) -> Result<(), DeviceError> {
		// Stateless HTTP sinks have no protocol-level connect step (§4.4):
		// go straight to Ready once constructed.
		self.base.lifecycle.apply(tsr_facade::LifecycleTransition::StartInit)?;
		self.base.lifecycle.apply(tsr_facade::LifecycleTransition::InitSucceeded)?;
		self.make_ready_commands = opts.make_ready_commands;
		self.make_ready_does_reset = opts.make_ready_does_reset;
		self.base.emit(FacadeEvent::ConnectionChanged(self.get_status()));
		Ok(())
	}

	async fn handle_state(&mut self, snapshot: &TimelineSnapshot, mappings: &Mappings) -> Result<(), DeviceError> {
		let previous_time = self.base.previous_time(snapshot.time);
		let old_state = self.base.store.get_state_before(previous_time).cloned().unwrap_or_else(HttpDeviceState::empty);

		let new_state = HttpProjector.project(snapshot, mappings)?;
		let commands = HttpDiffer.diff(&old_state, &new_state, snapshot.time);

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

	/// §6 `makeReadyCommands`/`makeReadyDoesReset`: HTTP sinks have no
	/// connect handshake to redo, so `make_ready` is just the generic
	/// replay-then-maybe-reset behavior every device gets.
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
