//! HTTP executor (§4.5): relevance check against the last sent payload per
//! layer, then a bounded single-retry-wave on retryable network errors.
//!
//! Grounded on `obs-websocket::core::retry::RetryPolicy` for the shape of a
//! transport error taxonomy, deliberately narrowed: no exponential backoff,
//! no circuit breaker, just the one resend per §4.5 ("schedule exactly one
//! retry after `resendTime`; a second failure is not retried").

use crate::command::HttpMethod;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use tsr_facade::TrackedState;
use tsr_signals::{Clock, DeviceError, FacadeEvent, NetworkErrorCode};
use tsr_state::Command;

#[derive(Debug, Clone)]
pub struct HttpResponse {
	pub status_code: u16,
	pub body: Value,
}

#[derive(Debug, Clone)]
pub enum HttpTransportError {
	Network(NetworkErrorCode),
	Other(String),
}

/// The network edge an `HttpExecutor` drives. Kept as a trait so tests can
/// supply a fake collaborator instead of opening real sockets.
#[async_trait]
pub trait HttpCollaborator: Send + Sync + 'static {
	async fn http_request(&self, method: HttpMethod, url: &str, body: &Value) -> Result<HttpResponse, HttpTransportError>;
}

pub struct HttpExecutor<C: HttpCollaborator> {
	collaborator: Arc<C>,
	last_sent: TrackedState<String, Value>,
	resend_time_ms: Option<i64>,
	clock: Arc<dyn Clock>,
	events: broadcast::Sender<FacadeEvent>,
}

impl<C: HttpCollaborator> HttpExecutor<C> {
	pub fn new(collaborator: Arc<C>, clock: Arc<dyn Clock>, resend_time_ms: Option<i64>, events: broadcast::Sender<FacadeEvent>) -> Self {
		Self {
			collaborator,
			last_sent: TrackedState::new(),
			resend_time_ms,
			clock,
			events,
		}
	}

	/// §6: a response outside the 2xx range is a warning, not an error — the
	/// command was delivered, the remote just didn't like it.
	fn warn_non_2xx_status(&self, timeline_obj_id: &str, status_code: u16) {
		let _ = self
			.events
			.send(FacadeEvent::Warning(format!("http {} responded with status {}", timeline_obj_id, status_code)));
	}

	/// Runs one command to completion: relevance check, dispatch, bounded
	/// retry-wave on retryable network errors.
	pub async fn execute(&self, command: Command<HttpMethod>) -> Result<(), DeviceError> {
		let fingerprint = json!({ "url": command.payload.get("url"), "params": command.payload.get("params") });

		if self.last_sent.get(&command.timeline_obj_id) == Some(fingerprint.clone()) {
			debug!(timeline_obj_id = %command.timeline_obj_id, "skipping identical repeat send");
			return Ok(());
		}

		let url = command.payload.get("url").and_then(|v| v.as_str()).unwrap_or_default().to_string();
		let body = command.payload.get("params").cloned().unwrap_or(Value::Null);

		let started_at = self.clock.now_ms();
		match self.collaborator.http_request(command.kind, &url, &body).await {
			Ok(response) => {
				self.last_sent.set(command.timeline_obj_id.clone(), fingerprint);
				if !(200..300).contains(&response.status_code) {
					self.warn_non_2xx_status(&command.timeline_obj_id, response.status_code);
				}
				Ok(())
			}
			Err(HttpTransportError::Network(code)) if code.is_retryable() => {
				warn!(timeline_obj_id = %command.timeline_obj_id, ?code, "retryable network error, scheduling one retry");
				self.retry_once(command, started_at, code).await
			}
			Err(HttpTransportError::Network(code)) => Err(DeviceError::Network {
				code,
				message: format!("non-retryable network error on {}", command.timeline_obj_id),
			}),
			Err(HttpTransportError::Other(message)) => Err(DeviceError::Protocol(message)),
		}
	}

	async fn retry_once(&self, command: Command<HttpMethod>, started_at: i64, code: NetworkErrorCode) -> Result<(), DeviceError> {
		let Some(resend_time_ms) = self.resend_time_ms else {
			return Err(DeviceError::Network {
				code,
				message: format!("network error on {}, retry disabled", command.timeline_obj_id),
			});
		};

		let elapsed = self.clock.now_ms() - started_at;
		let wait = (resend_time_ms - elapsed).max(0);
		if wait > 0 {
			tokio::time::sleep(std::time::Duration::from_millis(wait as u64)).await;
		}

		let url = command.payload.get("url").and_then(|v| v.as_str()).unwrap_or_default().to_string();
		let body = command.payload.get("params").cloned().unwrap_or(Value::Null);

		match self.collaborator.http_request(command.kind, &url, &body).await {
			Ok(response) => {
				let fingerprint = json!({ "url": command.payload.get("url"), "params": command.payload.get("params") });
				self.last_sent.set(command.timeline_obj_id.clone(), fingerprint);
				if !(200..300).contains(&response.status_code) {
					self.warn_non_2xx_status(&command.timeline_obj_id, response.status_code);
				}
				Ok(())
			}
			Err(HttpTransportError::Network(code)) => Err(DeviceError::Network {
				code,
				message: format!("retry failed for {}", command.timeline_obj_id),
			}),
			Err(HttpTransportError::Other(message)) => Err(DeviceError::Protocol(message)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use tsr_signals::ManualClock;

	struct CountingCollaborator {
		calls: AtomicU32,
		fail_first_n: u32,
	}

	#[async_trait]
	impl HttpCollaborator for CountingCollaborator {
		async fn http_request(&self, _method: HttpMethod, _url: &str, _body: &Value) -> Result<HttpResponse, HttpTransportError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst);
			if n < self.fail_first_n {
				Err(HttpTransportError::Network(NetworkErrorCode::Econnreset))
			} else {
				Ok(HttpResponse { status_code: 200, body: Value::Null })
			}
		}
	}

	fn command() -> Command<HttpMethod> {
		Command::new(0, HttpMethod::Post, "obj-1", "test").with_payload(json!({"url": "http://x", "params": {}}))
	}

	#[tokio::test]
	async fn relevance_check_skips_identical_repeat_send() {
		let collaborator = Arc::new(CountingCollaborator { calls: AtomicU32::new(0), fail_first_n: 0 });
		let clock = Arc::new(ManualClock::new(0));
		let (events, _rx) = broadcast::channel(16);
		let executor = HttpExecutor::new(collaborator.clone(), clock, Some(300), events);

		executor.execute(command()).await.unwrap();
		executor.execute(command()).await.unwrap();

		assert_eq!(collaborator.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn retryable_network_error_gets_exactly_one_retry() {
		let collaborator = Arc::new(CountingCollaborator { calls: AtomicU32::new(0), fail_first_n: 1 });
		let clock = Arc::new(ManualClock::new(0));
		let (events, _rx) = broadcast::channel(16);
		let executor = HttpExecutor::new(collaborator.clone(), clock, Some(300), events);

		executor.execute(command()).await.unwrap();

		assert_eq!(collaborator.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn second_failure_is_not_retried_again() {
		let collaborator = Arc::new(CountingCollaborator { calls: AtomicU32::new(0), fail_first_n: 2 });
		let clock = Arc::new(ManualClock::new(0));
		let (events, _rx) = broadcast::channel(16);
		let executor = HttpExecutor::new(collaborator.clone(), clock, Some(300), events);

		let result = executor.execute(command()).await;

		assert!(result.is_err());
		assert_eq!(collaborator.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn non_retryable_network_error_surfaces_immediately() {
		struct AlwaysOther;
		#[async_trait]
		impl HttpCollaborator for AlwaysOther {
			async fn http_request(&self, _method: HttpMethod, _url: &str, _body: &Value) -> Result<HttpResponse, HttpTransportError> {
				Err(HttpTransportError::Network(NetworkErrorCode::Other))
			}
		}

		let clock = Arc::new(ManualClock::new(0));
		let (events, _rx) = broadcast::channel(16);
		let executor = HttpExecutor::new(Arc::new(AlwaysOther), clock, Some(300), events);

		assert!(executor.execute(command()).await.is_err());
	}

	#[tokio::test]
	async fn non_2xx_status_emits_a_warning_and_succeeds() {
		struct BadStatusCollaborator;
		#[async_trait]
		impl HttpCollaborator for BadStatusCollaborator {
			async fn http_request(&self, _method: HttpMethod, _url: &str, _body: &Value) -> Result<HttpResponse, HttpTransportError> {
				Ok(HttpResponse { status_code: 500, body: Value::Null })
			}
		}

		let clock = Arc::new(ManualClock::new(0));
		let (events, mut rx) = broadcast::channel(16);
		let executor = HttpExecutor::new(Arc::new(BadStatusCollaborator), clock, Some(300), events);

		executor.execute(command()).await.unwrap();

		match rx.try_recv().unwrap() {
			FacadeEvent::Warning(message) => assert!(message.contains("500")),
			other => panic!("expected a warning event, got {other:?}"),
		}
	}
}
