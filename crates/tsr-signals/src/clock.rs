use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Injectable monotonic-ms time source (§9: "do not read wall clock directly
/// from the executor, to make tests deterministic").
pub trait Clock: Send + Sync + 'static {
	fn now_ms(&self) -> i64;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_ms(&self) -> i64 {
		SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
	}
}

/// Test clock that only advances when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
	now: Arc<AtomicI64>,
}

impl ManualClock {
	pub fn new(start_ms: i64) -> Self {
		Self { now: Arc::new(AtomicI64::new(start_ms)) }
	}

	pub fn set(&self, ms: i64) {
		self.now.store(ms, Ordering::SeqCst);
	}

	pub fn advance(&self, delta_ms: i64) {
		self.now.fetch_add(delta_ms, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> i64 {
		self.now.load(Ordering::SeqCst)
	}
}
