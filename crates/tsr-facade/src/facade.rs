//! Device Façade (§4.6): binds the Timed Queue, State Store and lifecycle
//! state machine together and exposes the public operations a conductor
//! calls.
//!
//! Per the design notes, device kinds are *not* modeled via inheritance: a
//! `TimedDeviceBase` struct provides the shared plumbing (queue, store,
//! lifecycle, event bus) and each device crate composes it, supplying its
//! own `Projector`/`Differ`/executor to implement `handle_state`.

use crate::lifecycle::{Lifecycle, LifecycleTransition};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use tsr_queue::{DeliveryMode, DoOnTime, DoOnTimeConfig, QueueSignal};
use tsr_signals::{Clock, ConnectionStatus, DeviceError, FacadeEvent};
use tsr_state::{DeviceState, Mappings, StateStore, Timestamp, TimelineSnapshot};

/// Shared plumbing every device façade embeds, per §9 "compose a common
/// `TimedDeviceBase`, do not inherit".
pub struct TimedDeviceBase<S: DeviceState> {
	pub store: StateStore<S>,
	pub queue: DoOnTime,
	pub lifecycle: Lifecycle,
	pub clock: Arc<dyn Clock>,
	events: broadcast::Sender<FacadeEvent>,
}

impl<S: DeviceState> TimedDeviceBase<S> {
	pub fn new(mode: DeliveryMode, clock: Arc<dyn Clock>) -> Self {
		let (events, _) = broadcast::channel(256);
		let queue = DoOnTime::new(mode, clock.clone(), DoOnTimeConfig::default());
		Self::bridge_queue_signals(&queue, events.clone());
		Self {
			store: StateStore::new(),
			queue,
			lifecycle: Lifecycle::new(),
			clock,
			events,
		}
	}

	/// Forwards the Timed Queue's own diagnostic signals onto the façade's
	/// event bus, so a conductor only has to subscribe once (§6 `commandError`
	/// / `slowCommand`). Runs until the queue's signal sender is dropped, i.e.
	/// until the façade itself is dropped.
	fn bridge_queue_signals(queue: &DoOnTime, events: broadcast::Sender<FacadeEvent>) {
		let mut signals = queue.subscribe();
		tokio::spawn(async move {
			loop {
				match signals.recv().await {
					Ok(QueueSignal::Error { context, message, .. }) => {
						let _ = events.send(FacadeEvent::Error { source: context, error: DeviceError::Protocol(message) });
					}
					Ok(QueueSignal::SlowCommand { context, overage_ms, .. }) => {
						let _ = events.send(FacadeEvent::SlowCommand(format!("{context} overran by {overage_ms}ms")));
					}
					Err(broadcast::error::RecvError::Lagged(_)) => continue,
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		});
	}

	pub fn subscribe(&self) -> broadcast::Receiver<FacadeEvent> {
		self.events.subscribe()
	}

	pub fn emit(&self, event: FacadeEvent) {
		let _ = self.events.send(event);
	}

	/// A cheap clone of the event sender, for command closures that need to
	/// emit from inside a queued callback without holding a `&TimedDeviceBase`.
	pub fn events_sender(&self) -> broadcast::Sender<FacadeEvent> {
		self.events.clone()
	}

	/// `previousTime = max(now, snapshot.time)` per §4.6.
	pub fn previous_time(&self, snapshot_time: Timestamp) -> Timestamp {
		self.clock.now_ms().max(snapshot_time)
	}

	/// Idempotent; cancels queued commands at or after `t` and prunes state
	/// entries accordingly, so a revised timeline can't double-fire (§4.6).
	pub async fn prepare_for_handle_state(&mut self, t: Timestamp) {
		self.queue.clear_queue_now_and_after(t).await;
		self.store.clean_up_states(0, t);
	}

	/// Removes queued commands with `executeAt > t`; does not touch
	/// committed stored states (§4.6).
	pub async fn clear_future(&mut self, t: Timestamp) {
		self.queue.clear_queue_after(t).await;
	}

	pub async fn terminate(&mut self) {
		debug!("tearing down device façade");
		self.queue.dispose().await;
		let _ = self.lifecycle.apply(LifecycleTransition::Terminate);
		self.emit(FacadeEvent::ConnectionChanged(ConnectionStatus::bad("terminated")));
	}

	pub fn connected(&self) -> bool {
		self.lifecycle.is_ready()
	}
}

/// The public lifecycle surface a conductor drives (§4.6).
#[async_trait]
pub trait DeviceFacade {
	type InitOptions: Send;

	async fn init(&mut self, opts: Self::InitOptions) -> Result<(), DeviceError>;

	async fn handle_state(&mut self, snapshot: &TimelineSnapshot, mappings: &Mappings) -> Result<(), DeviceError>;

	async fn clear_future(&mut self, t: Timestamp);

	async fn prepare_for_handle_state(&mut self, t: Timestamp);

	async fn make_ready(&mut self, ok_to_destroy: bool) -> Result<(), DeviceError>;

	async fn terminate(&mut self);

	fn get_status(&self) -> ConnectionStatus;

	fn connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Clone, PartialEq)]
	struct EmptyState;

	impl DeviceState for EmptyState {
		fn empty() -> Self {
			Self
		}
	}

	#[tokio::test]
	async fn previous_time_takes_the_later_of_now_and_snapshot() {
		let clock = Arc::new(tsr_signals::ManualClock::new(500));
		let base: TimedDeviceBase<EmptyState> = TimedDeviceBase::new(DeliveryMode::Burst, clock);

		assert_eq!(base.previous_time(100), 500);
		assert_eq!(base.previous_time(900), 900);
	}

	#[tokio::test]
	async fn terminate_marks_lifecycle_terminated() {
		let clock = Arc::new(tsr_signals::ManualClock::new(0));
		let mut base: TimedDeviceBase<EmptyState> = TimedDeviceBase::new(DeliveryMode::Burst, clock);
		base.terminate().await;
		assert!(base.lifecycle.is_terminated());
	}

	#[tokio::test]
	async fn a_failing_queued_command_surfaces_as_a_facade_error_event() {
		let clock = Arc::new(tsr_signals::ManualClock::new(0));
		let base: TimedDeviceBase<EmptyState> = TimedDeviceBase::new(DeliveryMode::Burst, clock);
		let mut events = base.subscribe();

		base.queue.queue(0, None, "boom", || async { Err("boom".to_string()) }).await;

		match tokio::time::timeout(std::time::Duration::from_millis(200), events.recv()).await {
			Ok(Ok(FacadeEvent::Error { source, .. })) => assert_eq!(source, "boom"),
			other => panic!("expected a FacadeEvent::Error, got {other:?}"),
		}
	}
}
